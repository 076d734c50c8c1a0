// 该文件是 Fanshen （翻身） 项目的一部分。
// tests/pipeline.rs - 张量解码到翻身计数的端到端测试
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

use fanshen::{
  model::{Layout, decode},
  pose::{CONFIDENCE_OFFSET, FEAT_DIM, KEYPOINT_OFFSET, KeypointIndex, NUM_KEYPOINTS},
  session::MonitorSession,
  tensor::Tensor,
};

const SHOULDER_SPAN: f32 = 100.0;

/// 整体平移 `dx` 个肩宽的姿态行
fn pose_row(dx: f32, score: f32) -> [f32; FEAT_DIM] {
  let mut row = [0f32; FEAT_DIM];
  row[0] = 250.0 + dx * SHOULDER_SPAN;
  row[1] = 250.0;
  row[2] = 200.0;
  row[3] = 300.0;
  row[CONFIDENCE_OFFSET] = score;
  for k in 0..NUM_KEYPOINTS {
    let (x, y) = if k == KeypointIndex::LeftShoulder as usize {
      (200.0, 200.0)
    } else if k == KeypointIndex::RightShoulder as usize {
      (200.0 + SHOULDER_SPAN, 200.0)
    } else {
      (50.0 + k as f32 * 7.0, 60.0 + k as f32 * 11.0)
    };
    let base = KEYPOINT_OFFSET + 3 * k;
    row[base] = x + dx * SHOULDER_SPAN;
    row[base + 1] = y;
    row[base + 2] = 0.9;
  }
  row
}

fn tensor(rows: &[[f32; FEAT_DIM]], layout: Layout) -> Tensor {
  let n = rows.len();
  match layout {
    Layout::DetectionMajor => {
      let data = rows.iter().flatten().copied().collect();
      Tensor::new(data, vec![1, n, FEAT_DIM]).unwrap()
    }
    Layout::FeatureMajor => {
      let mut data = vec![0f32; n * FEAT_DIM];
      for (i, row) in rows.iter().enumerate() {
        for (f, v) in row.iter().enumerate() {
          data[f * n + i] = *v;
        }
      }
      Tensor::new(data, vec![1, FEAT_DIM, n]).unwrap()
    }
  }
}

#[test]
fn test_layouts_decode_identically() {
  let rows = [pose_row(0.0, 0.9), pose_row(3.0, 0.1), pose_row(1.0, 0.6)];
  let a: Vec<_> = decode(&tensor(&rows, Layout::DetectionMajor), 0.25)
    .unwrap()
    .collect();
  let b: Vec<_> = decode(&tensor(&rows, Layout::FeatureMajor), 0.25)
    .unwrap()
    .collect();

  assert_eq!(a.len(), 2);
  assert_eq!(a, b);
  assert_eq!(a[1].score(), 0.6);
}

#[test]
fn test_turn_counted_through_session() {
  let mut session = MonitorSession::default();
  let sequence = [0.0, 0.2, 1.2, 1.3, 1.4, 0.3];
  let mut turns = Vec::new();
  let mut events = 0;

  for (i, dx) in sequence.into_iter().enumerate() {
    // 低分干扰检测与布局交替出现，不影响结果
    let rows = [pose_row(dx + 2.0, 0.3), pose_row(dx, 0.95)];
    let layout = if i % 2 == 0 {
      Layout::FeatureMajor
    } else {
      Layout::DetectionMajor
    };
    let report = session
      .process(&tensor(&rows, layout), Duration::from_millis(100 * i as u64))
      .unwrap();
    assert_eq!(report.detections.len(), 2);
    if report.turn_event().is_some() {
      events += 1;
    }
    turns.push(report.motion.unwrap().turns);
  }

  assert_eq!(turns, vec![0, 0, 0, 0, 1, 1]);
  assert_eq!(events, 1);
  assert_eq!(session.turns(), 1);
}

#[test]
fn test_empty_frames_keep_state() {
  let mut session = MonitorSession::default();
  session
    .process(&tensor(&[pose_row(0.0, 0.9)], Layout::DetectionMajor), Duration::ZERO)
    .unwrap();

  let report = session
    .process(&tensor(&[pose_row(5.0, 0.1)], Layout::DetectionMajor), Duration::from_secs(1))
    .unwrap();
  assert!(report.detections.is_empty());
  assert!(report.motion.is_none());
  assert_eq!(session.turns(), 0);
}
