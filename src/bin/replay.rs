// 该文件是 Fanshen （翻身） 项目的一部分。
// src/bin/replay.rs - 回放录制的推理输出张量
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
  fs::File,
  io::{BufRead, BufReader},
  path::PathBuf,
  time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use fanshen::{
  FromUrl,
  config::DetectionArgs,
  output::{EventOutputWrapper, Render},
  session::{MonitorSession, log_decode_error},
  tensor::Tensor,
};

/// 按录制顺序回放模型输出，统计翻身次数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 每行一个 JSON 对象: {"timestampMs": 0, "shape": [1, 56, 8400], "data": [...]}
  #[arg(long, value_name = "FILE")]
  pub input: PathBuf,

  /// 事件输出，可重复指定
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Vec<Url>,

  #[command(flatten)]
  pub detection: DetectionArgs,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RecordedOutput {
  timestamp_ms: u64,
  shape: Vec<usize>,
  data: Vec<f32>,
}

#[derive(Debug, Default)]
struct Summary {
  frames: usize,
  skipped: usize,
  observed: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let mut session = MonitorSession::new(
    args.detection.decode_threshold()?,
    args.detection.motion_config()?,
  )?;
  let output = args
    .output
    .iter()
    .map(EventOutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let file = File::open(&args.input)
    .with_context(|| format!("无法打开回放文件: {}", args.input.display()))?;

  let mut summary = Summary::default();
  for (line_no, line) in BufReader::new(file).lines().enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    summary.frames += 1;

    let recorded: RecordedOutput = match serde_json::from_str(&line) {
      Ok(recorded) => recorded,
      Err(err) => {
        warn!("第 {} 行无法解析: {}", line_no + 1, err);
        summary.skipped += 1;
        continue;
      }
    };
    let tensor = match Tensor::new(recorded.data, recorded.shape) {
      Ok(tensor) => tensor,
      Err(err) => {
        warn!("第 {} 行张量无效: {}", line_no + 1, err);
        summary.skipped += 1;
        continue;
      }
    };

    let now = Duration::from_millis(recorded.timestamp_ms);
    let report = match session.process(&tensor, now) {
      Ok(report) => report,
      Err(err) => {
        log_decode_error(&err);
        summary.skipped += 1;
        continue;
      }
    };
    if report.motion.is_some() {
      summary.observed += 1;
    }
    if let Err(err) = output.render_result(&(), &report) {
      warn!("输出失败: {}", err);
    }
  }

  info!(
    "回放完成: 共 {} 帧, 跳过 {} 帧, 有效观测 {} 帧",
    summary.frames, summary.skipped, summary.observed
  );
  println!(
    "frames={} skipped={} observed={} turns={}",
    summary.frames,
    summary.skipped,
    summary.observed,
    session.turns()
  );

  Ok(())
}
