// 该文件是 Fanshen （翻身） 项目的一部分。
// src/session.rs - 单对象监测会话：解码、选择与体动更新
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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  config::ConfigError,
  model::{BatchSizeWarning, DecodeError, best_detection, decode},
  motion::{MotionConfig, MotionDetector, MotionResult, MotionState},
  pose::Detection,
  tensor::Tensor,
};

/// 每次提交翻身时发给事件接收方的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEvent {
  pub turn_count: u64,
  pub movement: f32,
  pub timestamp: DateTime<Utc>,
}

/// 每帧体动记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionRecord {
  pub movement: f32,
  pub is_turn: bool,
  pub turns: u64,
  pub deferred: bool,
  pub timestamp: DateTime<Utc>,
}

/// 一帧处理结果
#[derive(Debug, Clone)]
pub struct FrameReport {
  pub detections: Vec<Detection>,
  pub motion: Option<MotionResult>,
  pub batch_warning: Option<BatchSizeWarning>,
  pub at: DateTime<Utc>,
}

impl FrameReport {
  pub fn turn_event(&self) -> Option<TurnEvent> {
    self
      .motion
      .filter(|m| m.is_turn)
      .map(|m| TurnEvent {
        turn_count: m.turns,
        movement: m.movement,
        timestamp: self.at,
      })
  }

  pub fn motion_record(&self) -> Option<MotionRecord> {
    self.motion.map(|m| MotionRecord {
      movement: m.movement,
      is_turn: m.is_turn,
      turns: m.turns,
      deferred: m.deferred.is_some(),
      timestamp: self.at,
    })
  }
}

/// 独占 `MotionState` 的串行处理路径
#[derive(Debug, Clone)]
pub struct MonitorSession {
  threshold: f32,
  detector: MotionDetector,
  state: MotionState,
}

impl MonitorSession {
  pub fn new(threshold: f32, config: MotionConfig) -> Result<Self, ConfigError> {
    if !(0.0..=1.0).contains(&threshold) {
      return Err(ConfigError::OutOfRange {
        name: "confidence",
        value: threshold,
      });
    }
    Ok(Self {
      threshold,
      detector: MotionDetector::new(config)?,
      state: MotionState::default(),
    })
  }

  pub fn state(&self) -> &MotionState {
    &self.state
  }

  pub fn turns(&self) -> u64 {
    self.state.turns()
  }

  /// 开始新的会话
  pub fn reset(&mut self) {
    self.state = MotionState::default();
  }

  /// 解码失败时直接返回错误，状态不受影响
  pub fn process(&mut self, output: &Tensor, now: Duration) -> Result<FrameReport, DecodeError> {
    let decoder = decode(output, self.threshold)?;
    let batch_warning = decoder.batch_warning();
    let detections: Vec<Detection> = decoder.collect();
    debug!("检测到 {} 个姿态", detections.len());

    let motion = self.observe(&detections, now);

    Ok(FrameReport {
      detections,
      motion,
      batch_warning,
      at: Utc::now(),
    })
  }

  /// 没有检测时本帧视为无观测
  pub fn observe(&mut self, detections: &[Detection], now: Duration) -> Option<MotionResult> {
    let best = best_detection(detections)?;
    let result = self.detector.update(&mut self.state, best, now);
    if let Some(reason) = result.deferred {
      debug!("本帧体动未更新: {:?}", reason);
    }
    Some(result)
  }
}

impl Default for MonitorSession {
  fn default() -> Self {
    Self {
      threshold: 0.25,
      detector: MotionDetector::default(),
      state: MotionState::default(),
    }
  }
}

/// 解码失败只记录日志，由调用方跳过该帧
pub fn log_decode_error(err: &DecodeError) {
  warn!("跳过无法解码的推理输出: {}", err);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::{tensors_from_rows, test_row},
    motion::tests::pose_shifted,
    pose::{CONFIDENCE_OFFSET, FEAT_DIM, KEYPOINT_OFFSET},
  };

  fn row_for(detection: &Detection) -> [f32; FEAT_DIM] {
    let mut row = [0f32; FEAT_DIM];
    row[0] = detection.bbox.cx;
    row[1] = detection.bbox.cy;
    row[2] = detection.bbox.width;
    row[3] = detection.bbox.height;
    row[CONFIDENCE_OFFSET] = detection.bbox.score;
    for (k, kp) in detection.keypoints.iter().enumerate() {
      row[KEYPOINT_OFFSET + 3 * k] = kp.x;
      row[KEYPOINT_OFFSET + 3 * k + 1] = kp.y;
      row[KEYPOINT_OFFSET + 3 * k + 2] = kp.confidence;
    }
    row
  }

  #[test]
  fn test_process_empty_frame_is_no_observation() {
    let mut session = MonitorSession::default();
    let (tensor, _) = tensors_from_rows(&[test_row(0.0, 0.1)]);
    let report = session.process(&tensor, Duration::ZERO).unwrap();
    assert!(report.detections.is_empty());
    assert!(report.motion.is_none());
    assert!(report.turn_event().is_none());
  }

  #[test]
  fn test_decode_error_leaves_state_untouched() {
    let mut session = MonitorSession::default();
    let (tensor, _) = tensors_from_rows(&[row_for(&pose_shifted(0.0))]);
    session.process(&tensor, Duration::ZERO).unwrap();
    let baseline = *session.state().baseline();

    let bad = Tensor::new(vec![0.0; 10], vec![1, 2, 5]).unwrap();
    assert!(matches!(
      session.process(&bad, Duration::from_millis(100)),
      Err(DecodeError::UnsupportedFeatureWidth(_))
    ));
    assert_eq!(session.state().baseline(), &baseline);
    assert_eq!(session.turns(), 0);
  }

  #[test]
  fn test_process_uses_best_detection_and_emits_event() {
    let mut session = MonitorSession::default();
    let frames = [0.0, 0.2, 1.2, 1.3, 1.4, 0.3];
    let mut events = Vec::new();

    for (i, dx) in frames.into_iter().enumerate() {
      let mut best = pose_shifted(dx);
      best.bbox.score = 0.9;
      // 低分干扰检测保持在远处
      let mut other = pose_shifted(5.0);
      other.bbox.score = 0.5;
      let (det_major, feat_major) = tensors_from_rows(&[row_for(&other), row_for(&best)]);
      let tensor = if i % 2 == 0 { det_major } else { feat_major };

      let report = session
        .process(&tensor, Duration::from_millis(100 * i as u64))
        .unwrap();
      assert_eq!(report.detections.len(), 2);
      if let Some(event) = report.turn_event() {
        events.push(event);
      }
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].turn_count, 1);
    assert!((events[0].movement - 1.4).abs() < 1e-4);
    assert_eq!(session.turns(), 1);
  }

  #[test]
  fn test_turn_event_json_shape() {
    let report = FrameReport {
      detections: Vec::new(),
      motion: Some(MotionResult {
        movement: 1.5,
        is_turn: true,
        turns: 3,
        deferred: None,
      }),
      batch_warning: None,
      at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
        .unwrap()
        .with_timezone(&Utc),
    };
    let json = serde_json::to_value(report.turn_event().unwrap()).unwrap();
    assert_eq!(json["turnCount"], 3);
    assert_eq!(json["movement"], 1.5);
    assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
  }

  #[test]
  fn test_reset_starts_fresh_session() {
    let mut session = MonitorSession::default();
    session.observe(&[pose_shifted(0.0)], Duration::ZERO);
    assert!(session.state().baseline().iter().any(Option::is_some));
    session.reset();
    assert!(session.state().baseline().iter().all(Option::is_none));
  }
}
