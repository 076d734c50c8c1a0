// 该文件是 Fanshen （翻身） 项目的一部分。
// src/model/decode.rs - YOLOv8-pose 输出张量解码
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

use std::iter::FusedIterator;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  pose::{
    BoundingBox, CONFIDENCE_OFFSET, Detection, FEAT_DIM, KEYPOINT_OFFSET, Keypoint, NUM_KEYPOINTS,
  },
  tensor::Tensor,
};

const OUTPUT_RANK: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("预期输出为 3 维张量, 实际形状 {0:?}")]
  UnexpectedRank(Vec<usize>),
  #[error("输出形状 {0:?} 中没有宽度为 56 的特征维")]
  UnsupportedFeatureWidth(Vec<usize>),
  #[error("输出数据被截断: 第一批次需要 {expected} 个元素, 实际 {actual} 个")]
  TruncatedData { expected: usize, actual: usize },
  #[error("输出形状 {0:?} 的元素个数溢出")]
  ShapeOverflow(Vec<usize>),
}

/// 批大小不为 1 时的提示，只使用第一批次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizeWarning {
  pub batch: usize,
}

/// 特征维所在位置，每次解码时根据形状确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  /// `[1, 56, N]`，索引为 `feature * N + detection`
  FeatureMajor,
  /// `[1, N, 56]`，索引为 `detection * 56 + feature`
  DetectionMajor,
}

impl Layout {
  /// 返回布局和候选检测数 N
  pub fn detect(shape: &[usize]) -> Result<(Self, usize), DecodeError> {
    if shape.len() != OUTPUT_RANK {
      return Err(DecodeError::UnexpectedRank(shape.to_vec()));
    }

    match (shape[1], shape[2]) {
      (FEAT_DIM, n) => Ok((Layout::FeatureMajor, n)),
      (n, FEAT_DIM) => Ok((Layout::DetectionMajor, n)),
      _ => Err(DecodeError::UnsupportedFeatureWidth(shape.to_vec())),
    }
  }

  #[inline]
  fn index(self, num_det: usize, det: usize, feat: usize) -> usize {
    match self {
      Layout::FeatureMajor => feat * num_det + det,
      Layout::DetectionMajor => det * FEAT_DIM + feat,
    }
  }
}

/// 单次遍历的检测序列，按原始索引升序产出置信度达标的检测
#[derive(Debug, Clone)]
pub struct PoseDecoder<'a> {
  data: &'a [f32],
  layout: Layout,
  num_det: usize,
  threshold: f32,
  next: usize,
  batch_warning: Option<BatchSizeWarning>,
}

/// 解码一个推理输出张量
pub fn decode(output: &Tensor, threshold: f32) -> Result<PoseDecoder<'_>, DecodeError> {
  let shape = output.shape();
  let (layout, num_det) = Layout::detect(shape)?;

  let batch = shape[0];
  let batch_warning = if batch != 1 {
    warn!("YOLO 批大小不为 1: {}, 仅使用第一批次", batch);
    Some(BatchSizeWarning { batch })
  } else {
    None
  };

  let expected = num_det
    .checked_mul(FEAT_DIM)
    .ok_or_else(|| DecodeError::ShapeOverflow(shape.to_vec()))?;
  let data = output.data();
  if data.len() < expected {
    return Err(DecodeError::TruncatedData {
      expected,
      actual: data.len(),
    });
  }

  debug!("解码输出: 形状 {:?}, 布局 {:?}, 候选数 {}", shape, layout, num_det);

  Ok(PoseDecoder {
    data: &data[..expected],
    layout,
    num_det,
    threshold,
    next: 0,
    batch_warning,
  })
}

impl PoseDecoder<'_> {
  pub fn layout(&self) -> Layout {
    self.layout
  }

  pub fn batch_warning(&self) -> Option<BatchSizeWarning> {
    self.batch_warning
  }

  #[inline]
  fn value(&self, det: usize, feat: usize) -> f32 {
    self.data[self.layout.index(self.num_det, det, feat)]
  }

  fn extract(&self, det: usize, score: f32) -> Detection {
    let keypoints = std::array::from_fn(|k| {
      let base = KEYPOINT_OFFSET + 3 * k;
      Keypoint::new(
        self.value(det, base),
        self.value(det, base + 1),
        self.value(det, base + 2),
      )
    });

    Detection {
      bbox: BoundingBox {
        cx: self.value(det, 0),
        cy: self.value(det, 1),
        width: self.value(det, 2),
        height: self.value(det, 3),
        score,
        class_id: 0,
      },
      keypoints,
    }
  }
}

impl Iterator for PoseDecoder<'_> {
  type Item = Detection;

  fn next(&mut self) -> Option<Self::Item> {
    while self.next < self.num_det {
      let det = self.next;
      self.next += 1;

      let score = self.value(det, CONFIDENCE_OFFSET);
      // NaN 也一并丢弃
      if !(score >= self.threshold) {
        continue;
      }
      return Some(self.extract(det, score));
    }
    None
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (0, Some(self.num_det - self.next))
  }
}

impl FusedIterator for PoseDecoder<'_> {}

// 关键点数与特征宽度必须一致
const _: () = assert!(KEYPOINT_OFFSET + 3 * NUM_KEYPOINTS == FEAT_DIM);
