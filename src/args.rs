// 该文件是 Fanshen （翻身） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

use fanshen::config::DetectionArgs;

/// Fanshen 睡眠翻身监测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 姿态模型，例如 onnx:///models/yolov8n-pose.onnx（输入尺寸固定为 640x640）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 单张图片: image:///path/to/frame.jpg
  /// - 图片目录: folder:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出，可重复指定
  /// 支持格式:
  /// - 日志: log://?verbose
  /// - 事件记录: record:///var/lib/fanshen?always
  /// - HTTP 推送: http://host/path
  /// - 骨架叠加图: image:///tmp/overlay.png?turns
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Vec<Url>,

  /// 采样间隔毫秒数
  #[arg(long, value_name = "MS", default_value_t = 1000)]
  pub interval_ms: u64,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frame_number: usize,

  /// 取帧与推理放到工作线程
  #[arg(long)]
  pub pipelined: bool,

  #[command(flatten)]
  pub detection: DetectionArgs,
}
