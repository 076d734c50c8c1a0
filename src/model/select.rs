// 该文件是 Fanshen （翻身） 项目的一部分。
// src/model/select.rs - 最佳检测选择
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

use crate::pose::Detection;

/// 选出边界框置信度最高的检测，置信度相同时保留靠前的一个
pub fn best_detection(detections: &[Detection]) -> Option<&Detection> {
  detections
    .iter()
    .reduce(|best, cur| if cur.score() > best.score() { cur } else { best })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pose::{BoundingBox, Keypoint, NUM_KEYPOINTS};

  fn detection(cx: f32, score: f32) -> Detection {
    Detection {
      bbox: BoundingBox {
        cx,
        cy: 0.0,
        width: 1.0,
        height: 1.0,
        score,
        class_id: 0,
      },
      keypoints: [Keypoint::default(); NUM_KEYPOINTS],
    }
  }

  #[test]
  fn test_best_detection_empty() {
    assert!(best_detection(&[]).is_none());
  }

  #[test]
  fn test_best_detection_picks_highest_score() {
    let dets = [detection(0.0, 0.4), detection(1.0, 0.9), detection(2.0, 0.7)];
    assert_eq!(best_detection(&dets).unwrap().bbox.cx, 1.0);
  }

  #[test]
  fn test_best_detection_tie_keeps_first() {
    let dets = [detection(0.0, 0.8), detection(1.0, 0.8)];
    assert_eq!(best_detection(&dets).unwrap().bbox.cx, 0.0);
  }
}
