// 该文件是 Fanshen （翻身） 项目的一部分。
// src/output/record_output.rs - 按日期目录记录翻身事件
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

use std::{
  fs::OpenOptions,
  io::Write,
  path::PathBuf,
  sync::Mutex,
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::Render,
  session::{FrameReport, MotionRecord, TurnEvent},
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RecordLine<'a> {
  Turn(&'a TurnEvent),
  Motion(&'a MotionRecord),
}

/// 以 JSON Lines 追加写入 `目录/年/月/日.jsonl`
pub struct RecordOutput {
  directory: PathBuf,
  always: bool,
  lock: Mutex<()>,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    Ok(RecordOutput {
      directory: PathBuf::from(uri.path()),
      always: uri.query_pairs().any(|(k, _)| k == "always"),
      lock: Mutex::new(()),
    })
  }
}

impl RecordOutput {
  fn record_path(&self, at: &DateTime<Utc>) -> Result<PathBuf, std::io::Error> {
    let directory = self
      .directory
      .join(at.year().to_string())
      .join(format!("{:02}", at.month()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }
    Ok(directory.join(format!("{:02}.jsonl", at.day())))
  }

  fn append(&self, at: &DateTime<Utc>, lines: &[RecordLine]) -> Result<(), RecordOutputError> {
    if lines.is_empty() {
      return Ok(());
    }

    let mut buffer = Vec::new();
    for line in lines {
      serde_json::to_writer(&mut buffer, line)?;
      buffer.push(b'\n');
    }

    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let path = self.record_path(at)?;
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(&buffer)?;
    debug!("写入 {} 条记录到 {}", lines.len(), path.display());
    Ok(())
  }
}

impl<F> Render<F, FrameReport> for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, _frame: &F, result: &FrameReport) -> Result<(), Self::Error> {
    let motion = self.always.then(|| result.motion_record()).flatten();
    let event = result.turn_event();

    let mut lines = Vec::with_capacity(2);
    if let Some(motion) = motion.as_ref() {
      lines.push(RecordLine::Motion(motion));
    }
    if let Some(event) = event.as_ref() {
      lines.push(RecordLine::Turn(event));
    }
    self.append(&result.at, &lines)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::motion::MotionResult;

  fn report(is_turn: bool, turns: u64) -> FrameReport {
    FrameReport {
      detections: Vec::new(),
      motion: Some(MotionResult {
        movement: if is_turn { 1.2 } else { 0.1 },
        is_turn,
        turns,
        deferred: None,
      }),
      batch_warning: None,
      at: DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
        .unwrap()
        .with_timezone(&Utc),
    }
  }

  fn output_in(dir: &std::path::Path, query: &str) -> RecordOutput {
    let url = url::Url::parse(&format!("record://{}{}", dir.display(), query)).unwrap();
    RecordOutput::from_url(&url).unwrap()
  }

  #[test]
  fn test_record_only_turn_events() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_in(dir.path(), "");

    output.render_result(&(), &report(false, 0)).unwrap();
    output.render_result(&(), &report(true, 1)).unwrap();

    let content = std::fs::read_to_string(dir.path().join("2026/03/04.jsonl")).unwrap();
    let lines: Vec<serde_json::Value> = content
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["kind"], "turn");
    assert_eq!(lines[0]["turnCount"], 1);
  }

  #[test]
  fn test_record_always_includes_motion() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_in(dir.path(), "?always");

    output.render_result(&(), &report(false, 0)).unwrap();
    output.render_result(&(), &report(true, 1)).unwrap();

    let content = std::fs::read_to_string(dir.path().join("2026/03/04.jsonl")).unwrap();
    let kinds: Vec<String> = content
      .lines()
      .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["kind"].to_string())
      .collect();
    assert_eq!(kinds, vec!["\"motion\"", "\"motion\"", "\"turn\""]);
  }
}
