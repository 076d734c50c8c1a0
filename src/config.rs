// 该文件是 Fanshen （翻身） 项目的一部分。
// src/config.rs - 检测参数配置
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

use clap::Args;
use thiserror::Error;

use crate::motion::{GateConfig, MotionConfig};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("参数 {name} 超出范围: {value}")]
  OutOfRange { name: &'static str, value: f32 },
  #[error("最少可见关键点数必须在 1..=17 之间, 实际为 {0}")]
  InvalidQuorum(usize),
  #[error("下阈值 {lower} 必须小于上阈值 {upper}")]
  InvertedThresholds { lower: f32, upper: f32 },
}

/// 解码与体动检测参数，各二进制程序通过 `#[command(flatten)]` 复用
#[derive(Args, Debug, Clone)]
pub struct DetectionArgs {
  /// 检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 关键点可见度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub visibility: f32,

  /// 每帧最少可见关键点数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub min_keypoints: usize,

  /// 进入翻身状态的体动上阈值（体尺度单位）
  #[arg(long, default_value = "1.0", value_name = "MOVEMENT")]
  pub upper_threshold: f32,

  /// 回到静止状态的体动下阈值（体尺度单位）
  #[arg(long, default_value = "0.4", value_name = "MOVEMENT")]
  pub lower_threshold: f32,

  /// 体动超过上阈值需持续的毫秒数
  #[arg(long, default_value = "300", value_name = "MS")]
  pub dwell_ms: u64,

  /// 两次翻身之间的不应期毫秒数
  #[arg(long, default_value = "500", value_name = "MS")]
  pub refractory_ms: u64,

  /// 翻身后静止多少毫秒以新姿态为基准（0 表示关闭）
  #[arg(long, default_value = "3000", value_name = "MS")]
  pub rest_rebaseline_ms: u64,
}

impl DetectionArgs {
  pub fn decode_threshold(&self) -> Result<f32, ConfigError> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(ConfigError::OutOfRange {
        name: "confidence",
        value: self.confidence,
      });
    }
    Ok(self.confidence)
  }

  pub fn motion_config(&self) -> Result<MotionConfig, ConfigError> {
    let config = MotionConfig {
      visibility_threshold: self.visibility,
      min_keypoints: self.min_keypoints,
      gate: GateConfig {
        upper: self.upper_threshold,
        lower: self.lower_threshold,
        dwell: Duration::from_millis(self.dwell_ms),
        refractory: Duration::from_millis(self.refractory_ms),
      },
      rest_rebaseline: (self.rest_rebaseline_ms > 0)
        .then(|| Duration::from_millis(self.rest_rebaseline_ms)),
    };
    config.validate()?;
    Ok(config)
  }
}
