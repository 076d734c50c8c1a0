// 该文件是 Fanshen （翻身） 项目的一部分。
// src/pose.rs - 姿态检测结果定义
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

/// 单个检测的特征宽度：4 (框) + 1 (置信度) + 3 * 17 (关键点)
pub const FEAT_DIM: usize = 56;
pub const NUM_KEYPOINTS: usize = 17;
/// 关键点在特征向量中的起始偏移
pub const KEYPOINT_OFFSET: usize = 5;
pub const CONFIDENCE_OFFSET: usize = 4;

/// COCO 17 关键点顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
  Nose = 0,
  LeftEye = 1,
  RightEye = 2,
  LeftEar = 3,
  RightEar = 4,
  LeftShoulder = 5,
  RightShoulder = 6,
  LeftElbow = 7,
  RightElbow = 8,
  LeftWrist = 9,
  RightWrist = 10,
  LeftHip = 11,
  RightHip = 12,
  LeftKnee = 13,
  RightKnee = 14,
  LeftAnkle = 15,
  RightAnkle = 16,
}

/// 叠加层使用的骨架连线
pub const SKELETON_EDGES: [(KeypointIndex, KeypointIndex); 12] = {
  use KeypointIndex::*;
  [
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    (LeftHip, LeftKnee),
    (LeftKnee, LeftAnkle),
    (RightHip, RightKnee),
    (RightKnee, RightAnkle),
  ]
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
  pub x: f32,
  pub y: f32,
  pub confidence: f32,
}

impl Keypoint {
  pub fn new(x: f32, y: f32, confidence: f32) -> Self {
    Self { x, y, confidence }
  }

  /// 置信度达到阈值视为可见
  pub fn is_visible(&self, threshold: f32) -> bool {
    self.confidence >= threshold
  }

  pub fn distance(&self, other: &Keypoint) -> f32 {
    (self.x - other.x).hypot(self.y - other.y)
  }
}

/// 中心点格式的边界框，坐标保持模型输出坐标系
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub cx: f32,
  pub cy: f32,
  pub width: f32,
  pub height: f32,
  pub score: f32,
  pub class_id: u32,
}

impl BoundingBox {
  /// [x_min, y_min, x_max, y_max]
  pub fn corners(&self) -> [f32; 4] {
    let (hw, hh) = (self.width / 2.0, self.height / 2.0);
    [self.cx - hw, self.cy - hh, self.cx + hw, self.cy + hh]
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: BoundingBox,
  pub keypoints: [Keypoint; NUM_KEYPOINTS],
}

impl Detection {
  pub fn keypoint(&self, index: KeypointIndex) -> &Keypoint {
    &self.keypoints[index as usize]
  }

  pub fn score(&self) -> f32 {
    self.bbox.score
  }

  pub fn visible_count(&self, threshold: f32) -> usize {
    self
      .keypoints
      .iter()
      .filter(|k| k.is_visible(threshold))
      .count()
  }
}
