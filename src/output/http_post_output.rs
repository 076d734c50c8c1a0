// 该文件是 Fanshen （翻身） 项目的一部分。
// src/output/http_post_output.rs - HTTP POST 翻身事件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, output::Render, session::FrameReport};

const HTTP_POST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum HttpPostOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("HTTP 请求错误: {0}")]
  RequestError(#[from] Box<ureq::Error>),
}

/// 每次翻身向服务端 POST 一条 JSON 事件
pub struct HttpPostOutput {
  url: Url,
  agent: ureq::Agent,
}

impl FromUrl for HttpPostOutput {
  type Error = HttpPostOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != "http" && url.scheme() != "https" {
      return Err(HttpPostOutputError::SchemeMismatch(url.scheme().to_string()));
    }

    let agent = ureq::AgentBuilder::new()
      .timeout(HTTP_POST_TIMEOUT)
      .build();
    Ok(HttpPostOutput {
      url: url.clone(),
      agent,
    })
  }
}

impl<F> Render<F, FrameReport> for HttpPostOutput {
  type Error = HttpPostOutputError;

  fn render_result(&self, _frame: &F, result: &FrameReport) -> Result<(), Self::Error> {
    let Some(event) = result.turn_event() else {
      return Ok(());
    };

    let body = serde_json::to_string(&event)?;
    debug!("POST {} {}", self.url, body);
    let response = self
      .agent
      .post(self.url.as_str())
      .set("Content-Type", "application/json")
      .send_string(&body)
      .map_err(Box::new)?;
    info!("翻身事件已发送: {} -> {}", event.turn_count, response.status());
    Ok(())
  }
}
