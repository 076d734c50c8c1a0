// 该文件是 Fanshen （翻身） 项目的一部分。
// src/output.rs - 输出定义：翻身事件接收方与骨架叠加
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

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, session::FrameReport};

pub trait Render<F, O>: Sized {
  type Error;
  fn render_result(&self, frame: &F, result: &O) -> Result<(), Self::Error>;
}

/// 逐个输出，某个输出失败不影响其后的输出，返回第一个错误
impl<F, O, R> Render<F, O> for Vec<R>
where
  R: Render<F, O>,
  R::Error: std::fmt::Display,
{
  type Error = R::Error;

  fn render_result(&self, frame: &F, result: &O) -> Result<(), Self::Error> {
    let mut first = None;
    for output in self {
      if let Err(err) = output.render_result(frame, result) {
        match first {
          None => first = Some(err),
          Some(_) => warn!("输出失败: {}", err),
        }
      }
    }
    first.map_or(Ok(()), Err)
  }
}

mod log_output;
pub use self::log_output::LogOutput;

mod record_output;
pub use self::record_output::{RecordOutput, RecordOutputError};

#[cfg(feature = "http_output")]
mod http_post_output;
#[cfg(feature = "http_output")]
pub use self::http_post_output::{HttpPostOutput, HttpPostOutputError};

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("记录输出错误: {0}")]
  RecordOutputError(#[from] RecordOutputError),
  #[cfg(feature = "http_output")]
  #[error("HTTP 事件输出错误: {0}")]
  HttpPostOutputError(#[from] HttpPostOutputError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 只关心翻身事件的输出，不需要帧数据
pub enum EventOutputWrapper {
  Log(LogOutput),
  Record(RecordOutput),
  #[cfg(feature = "http_output")]
  HttpPost(HttpPostOutput),
}

impl FromUrl for EventOutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(EventOutputWrapper::Log(LogOutput::from_url(url)?)),
      RecordOutput::SCHEME => Ok(EventOutputWrapper::Record(RecordOutput::from_url(url)?)),
      #[cfg(feature = "http_output")]
      "http" | "https" => Ok(EventOutputWrapper::HttpPost(HttpPostOutput::from_url(url)?)),
      scheme => Err(OutputError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl<F> Render<F, FrameReport> for EventOutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &FrameReport) -> Result<(), Self::Error> {
    match self {
      EventOutputWrapper::Log(output) => output.render_result(frame, result).map_err(|e| match e {}),
      EventOutputWrapper::Record(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "http_output")]
      EventOutputWrapper::HttpPost(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

pub enum OutputWrapper {
  Event(EventOutputWrapper),
  #[cfg(feature = "save_image_file")]
  SaveImageFile(SaveImageFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => Ok(OutputWrapper::SaveImageFile(
        SaveImageFileOutput::from_url(url)?,
      )),
      _ => Ok(OutputWrapper::Event(EventOutputWrapper::from_url(url)?)),
    }
  }
}

impl Render<Frame, FrameReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, result: &FrameReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Event(output) => output.render_result(frame, result),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFile(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_event_output_from_url() {
    let log = EventOutputWrapper::from_url(&Url::parse("log:").unwrap()).unwrap();
    assert!(matches!(log, EventOutputWrapper::Log(_)));

    let err = EventOutputWrapper::from_url(&Url::parse("ftp://example.com").unwrap());
    assert!(matches!(err, Err(OutputError::SchemeMismatch(s)) if s == "ftp"));
  }

  struct Failing;

  impl Render<(), ()> for Failing {
    type Error = String;

    fn render_result(&self, _frame: &(), _result: &()) -> Result<(), String> {
      Err("sink down".to_string())
    }
  }

  struct Counting(std::cell::Cell<usize>);

  impl Render<(), ()> for Counting {
    type Error = String;

    fn render_result(&self, _frame: &(), _result: &()) -> Result<(), String> {
      self.0.set(self.0.get() + 1);
      Ok(())
    }
  }

  enum Sink {
    Failing(Failing),
    Counting(Counting),
  }

  impl Render<(), ()> for Sink {
    type Error = String;

    fn render_result(&self, frame: &(), result: &()) -> Result<(), String> {
      match self {
        Sink::Failing(sink) => sink.render_result(frame, result),
        Sink::Counting(sink) => sink.render_result(frame, result),
      }
    }
  }

  #[test]
  fn test_failed_output_does_not_skip_later_outputs() {
    let outputs = vec![
      Sink::Failing(Failing),
      Sink::Counting(Counting(std::cell::Cell::new(0))),
      Sink::Failing(Failing),
    ];

    assert_eq!(outputs.render_result(&(), &()), Err("sink down".to_string()));
    let Sink::Counting(counting) = &outputs[1] else {
      unreachable!()
    };
    assert_eq!(counting.0.get(), 1);
  }
}
