// 该文件是 Fanshen （翻身） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use fanshen::{
  FromUrl,
  input::InputWrapper,
  model::PoseOnnxBuilder,
  output::OutputWrapper,
  session::MonitorSession,
  task::{ContinuousTask, PipelinedTask, Task},
};

// 输入帧缩放到的尺寸，模型 URL 中的 width/height 必须与之相同
const INPUT_WIDTH: u32 = 640;
const INPUT_HEIGHT: u32 = 640;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  for output in &args.output {
    info!("输出路径: {}", output);
  }

  let session = MonitorSession::new(
    args.detection.decode_threshold()?,
    args.detection.motion_config()?,
  )?;

  let input = InputWrapper::<INPUT_WIDTH, INPUT_HEIGHT>::from_url(&args.input)?;
  let model = PoseOnnxBuilder::from_url(&args.model)?
    .require_input_size(INPUT_WIDTH as usize, INPUT_HEIGHT as usize)?
    .build()?;
  info!("模型输入尺寸: {:?}", model.input_size());
  let output = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let frame_number = (args.frame_number > 0).then_some(args.frame_number);
  let interval = Duration::from_millis(args.interval_ms);

  if args.pipelined {
    PipelinedTask::new(session)
      .with_frame_number(frame_number)
      .with_interval(interval)
      .run_task(input, model, output)
  } else {
    ContinuousTask::new(session)
      .with_frame_number(frame_number)
      .with_interval(interval)
      .run_task(input, model, output)
  }
}
