// 该文件是 Fanshen （翻身） 项目的一部分。
// src/motion/scale.rs - 体尺度归一化与位移计算
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

use crate::pose::{Detection, Keypoint, KeypointIndex, NUM_KEYPOINTS};

/// 按关键点序号存放的可见关键点，不可见为 `None`
pub type PoseSlots = [Option<Keypoint>; NUM_KEYPOINTS];

const MIN_BODY_SCALE: f32 = 1e-6;

/// 置信度达标且坐标有限的关键点
pub fn visible_slots(detection: &Detection, threshold: f32) -> PoseSlots {
  detection
    .keypoints
    .map(|k| (k.is_visible(threshold) && k.x.is_finite() && k.y.is_finite()).then_some(k))
}

fn span(slots: &PoseSlots, a: KeypointIndex, b: KeypointIndex) -> Option<f32> {
  let d = slots[a as usize]?.distance(&slots[b as usize]?);
  (d.is_finite() && d > MIN_BODY_SCALE).then_some(d)
}

/// 双肩距离，不可用时退回双髋距离
pub fn body_scale(slots: &PoseSlots) -> Option<f32> {
  span(slots, KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder)
    .or_else(|| span(slots, KeypointIndex::LeftHip, KeypointIndex::RightHip))
}

/// 两组关键点中同时可见部分的平均位移，除以体尺度；没有共同关键点时返回 `None`
pub fn mean_displacement(from: &PoseSlots, to: &PoseSlots, scale: f32) -> Option<f32> {
  let (sum, count) = from
    .iter()
    .zip(to.iter())
    .filter_map(|(a, b)| Some(a.as_ref()?.distance(b.as_ref()?)))
    .fold((0f32, 0usize), |(sum, count), d| (sum + d, count + 1));

  (count > 0).then(|| sum / count as f32 / scale)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn slots_with(points: &[(KeypointIndex, f32, f32)]) -> PoseSlots {
    let mut slots: PoseSlots = [None; NUM_KEYPOINTS];
    for &(idx, x, y) in points {
      slots[idx as usize] = Some(Keypoint::new(x, y, 0.9));
    }
    slots
  }

  #[test]
  fn test_body_scale_prefers_shoulders() {
    let slots = slots_with(&[
      (KeypointIndex::LeftShoulder, 0.0, 0.0),
      (KeypointIndex::RightShoulder, 30.0, 40.0),
      (KeypointIndex::LeftHip, 0.0, 100.0),
      (KeypointIndex::RightHip, 10.0, 100.0),
    ]);
    assert_eq!(body_scale(&slots), Some(50.0));
  }

  #[test]
  fn test_body_scale_falls_back_to_hips() {
    let slots = slots_with(&[
      (KeypointIndex::LeftShoulder, 0.0, 0.0),
      (KeypointIndex::LeftHip, 0.0, 100.0),
      (KeypointIndex::RightHip, 20.0, 100.0),
    ]);
    assert_eq!(body_scale(&slots), Some(20.0));
  }

  #[test]
  fn test_body_scale_degenerate() {
    let slots = slots_with(&[
      (KeypointIndex::LeftShoulder, 5.0, 5.0),
      (KeypointIndex::RightShoulder, 5.0, 5.0),
    ]);
    assert_eq!(body_scale(&slots), None);
  }

  #[test]
  fn test_mean_displacement_uses_common_keypoints_only() {
    let from = slots_with(&[(KeypointIndex::Nose, 0.0, 0.0), (KeypointIndex::LeftEye, 0.0, 0.0)]);
    let to = slots_with(&[(KeypointIndex::Nose, 3.0, 4.0), (KeypointIndex::RightEye, 100.0, 0.0)]);
    assert_eq!(mean_displacement(&from, &to, 5.0), Some(1.0));

    let disjoint = slots_with(&[(KeypointIndex::RightEar, 0.0, 0.0)]);
    assert_eq!(mean_displacement(&from, &disjoint, 5.0), None);
  }

  #[test]
  fn test_visible_slots_drop_non_finite_coordinates() {
    let mut keypoints = [Keypoint::new(1.0, 2.0, 0.9); NUM_KEYPOINTS];
    keypoints[KeypointIndex::Nose as usize].x = f32::NAN;
    keypoints[KeypointIndex::LeftEye as usize].y = f32::INFINITY;
    keypoints[KeypointIndex::RightEye as usize].confidence = 0.1;
    let detection = Detection {
      bbox: crate::pose::BoundingBox {
        cx: 0.0,
        cy: 0.0,
        width: 1.0,
        height: 1.0,
        score: 0.9,
        class_id: 0,
      },
      keypoints,
    };

    let slots = visible_slots(&detection, 0.2);
    assert!(slots[KeypointIndex::Nose as usize].is_none());
    assert!(slots[KeypointIndex::LeftEye as usize].is_none());
    assert!(slots[KeypointIndex::RightEye as usize].is_none());
    assert_eq!(slots.iter().flatten().count(), NUM_KEYPOINTS - 3);
  }
}
