// 该文件是 Fanshen （翻身） 项目的一部分。
// src/frame.rs - 交错像素帧定义与 NCHW 预处理
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

use crate::tensor::Tensor;

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("不支持的通道数: {0}")]
  UnsupportedChannels(usize),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("帧尺寸为空: {0}x{1}")]
  EmptyFrame(usize, usize),
}

/// 一帧交错排列（HWC）的 RGB / RGBA 原始字节
#[derive(Debug, Clone)]
pub struct Frame {
  width: usize,
  height: usize,
  channels: usize,
  data: Box<[u8]>,
}

impl Frame {
  pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self, FrameError> {
    if channels != RGB_CHANNELS && channels != RGBA_CHANNELS {
      return Err(FrameError::UnsupportedChannels(channels));
    }
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyFrame(width, height));
    }

    let expected = width * height * channels;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      channels,
      data: data.into_boxed_slice(),
    })
  }

  pub fn rgb(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
    Self::new(width, height, RGB_CHANNELS, data)
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  /// 第 (x, y) 个像素的 RGB 值，RGBA 帧忽略 alpha
  pub fn rgb_at(&self, x: usize, y: usize) -> [u8; 3] {
    let base = (y * self.width + x) * self.channels;
    [self.data[base], self.data[base + 1], self.data[base + 2]]
  }

  /// 转换为 `[1, 3, H, W]` 的模型输入张量，像素值归一化到 [0, 1]
  pub fn to_input_tensor(&self) -> Tensor {
    let plane = self.width * self.height;
    let mut chw = vec![0f32; RGB_CHANNELS * plane];

    for i in 0..plane {
      let base = i * self.channels;
      chw[i] = self.data[base] as f32 / 255.0;
      chw[plane + i] = self.data[base + 1] as f32 / 255.0;
      chw[2 * plane + i] = self.data[base + 2] as f32 / 255.0;
    }

    Tensor::from_raw(chw, vec![1, RGB_CHANNELS, self.height, self.width])
  }
}

impl AsRef<[u8]> for Frame {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}
