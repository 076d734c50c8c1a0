// 该文件是 Fanshen （翻身） 项目的一部分。
// src/motion.rs - 基于关键点的体动与翻身检测
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

use tracing::{debug, info};

use crate::{
  config::ConfigError,
  pose::{Detection, NUM_KEYPOINTS},
};

mod gate;
mod scale;
pub use self::gate::{GateConfig, GateStep, TurnGate, TurnPhase};
pub use self::scale::{PoseSlots, body_scale, mean_displacement, visible_slots};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
  /// 关键点可见的最低置信度
  pub visibility_threshold: f32,
  /// 一帧至少需要的可见关键点数
  pub min_keypoints: usize,
  pub gate: GateConfig,
  /// 翻身提交后若姿态静止了这么久，以当前姿态作为新的基准
  pub rest_rebaseline: Option<Duration>,
}

impl Default for MotionConfig {
  fn default() -> Self {
    Self {
      visibility_threshold: 0.2,
      min_keypoints: 4,
      gate: GateConfig::default(),
      rest_rebaseline: Some(Duration::from_secs(3)),
    }
  }
}

impl MotionConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    let GateConfig { upper, lower, .. } = self.gate;
    if !(0.0..=1.0).contains(&self.visibility_threshold) {
      return Err(ConfigError::OutOfRange {
        name: "visibility_threshold",
        value: self.visibility_threshold,
      });
    }
    if !(1..=NUM_KEYPOINTS).contains(&self.min_keypoints) {
      return Err(ConfigError::InvalidQuorum(self.min_keypoints));
    }
    for (name, value) in [("upper", upper), ("lower", lower)] {
      if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::OutOfRange { name, value });
      }
    }
    if lower >= upper {
      return Err(ConfigError::InvertedThresholds { lower, upper });
    }
    Ok(())
  }
}

/// 延迟更新的原因，不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
  TooFewKeypoints { visible: usize },
  NoBodyScale,
  BaselineSeeded,
  NoCommonKeypoints,
  /// 坐标过大导致位移溢出
  NonFiniteMovement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionResult {
  pub movement: f32,
  pub is_turn: bool,
  pub turns: u64,
  pub deferred: Option<DeferReason>,
}

/// 单个监测对象的会话状态，按时间顺序串行更新
#[derive(Debug, Clone)]
pub struct MotionState {
  baseline: PoseSlots,
  previous: PoseSlots,
  gate: TurnGate,
  turns: u64,
  movement: f32,
  scale: Option<f32>,
  rest_since: Option<Duration>,
}

impl Default for MotionState {
  fn default() -> Self {
    Self {
      baseline: [None; NUM_KEYPOINTS],
      previous: [None; NUM_KEYPOINTS],
      gate: TurnGate::default(),
      turns: 0,
      movement: 0.0,
      scale: None,
      rest_since: None,
    }
  }
}

impl MotionState {
  pub fn turns(&self) -> u64 {
    self.turns
  }

  pub fn movement(&self) -> f32 {
    self.movement
  }

  pub fn phase(&self) -> TurnPhase {
    self.gate.phase()
  }

  pub fn baseline(&self) -> &PoseSlots {
    &self.baseline
  }

  pub fn body_scale(&self) -> Option<f32> {
    self.scale
  }

  pub fn last_turn_at(&self) -> Option<Duration> {
    self.gate.last_turn_at()
  }

  fn fill_missing_baseline(&mut self, current: &PoseSlots) {
    for (slot, kp) in self.baseline.iter_mut().zip(current.iter()) {
      if slot.is_none() {
        *slot = *kp;
      }
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct MotionDetector {
  config: MotionConfig,
}

impl MotionDetector {
  pub fn new(config: MotionConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &MotionConfig {
    &self.config
  }

  fn defer(&self, state: &MotionState, reason: DeferReason) -> MotionResult {
    debug!("体动更新延迟: {:?}", reason);
    MotionResult {
      movement: state.movement,
      is_turn: false,
      turns: state.turns,
      deferred: Some(reason),
    }
  }

  /// 用一帧的最佳检测推进状态，`now` 为会话内单调时间
  pub fn update(&self, state: &mut MotionState, detection: &Detection, now: Duration) -> MotionResult {
    let current = visible_slots(detection, self.config.visibility_threshold);
    let visible = current.iter().flatten().count();
    if visible < self.config.min_keypoints {
      return self.defer(state, DeferReason::TooFewKeypoints { visible });
    }

    let scale = match body_scale(&current).or(state.scale) {
      Some(scale) => scale,
      None => return self.defer(state, DeferReason::NoBodyScale),
    };
    state.scale = Some(scale);

    if state.baseline.iter().all(Option::is_none) {
      state.baseline = current;
      state.previous = current;
      return self.defer(state, DeferReason::BaselineSeeded);
    }

    let Some(movement) = mean_displacement(&state.baseline, &current, scale) else {
      if state.gate.is_settled() {
        state.fill_missing_baseline(&current);
      }
      return self.defer(state, DeferReason::NoCommonKeypoints);
    };
    if !movement.is_finite() {
      return self.defer(state, DeferReason::NonFiniteMovement);
    }
    state.movement = movement;

    let step = state.gate.step(&self.config.gate, movement, now);
    if step.committed {
      state.turns += 1;
      info!("检测到翻身: 第 {} 次, movement={:.3}", state.turns, movement);
    }

    if step.settled {
      debug!("回到静止状态, 更新基准姿态");
      state.baseline = current;
    } else if state.gate.is_settled() {
      state.fill_missing_baseline(&current);
    }

    self.track_rest(state, &current, scale, now);
    state.previous = current;

    MotionResult {
      movement,
      is_turn: step.committed,
      turns: state.turns,
      deferred: None,
    }
  }

  /// 翻身后停在新姿态时，相对旧基准的位移不会回落，静止足够久后换基准
  fn track_rest(&self, state: &mut MotionState, current: &PoseSlots, scale: f32, now: Duration) {
    let still = mean_displacement(&state.previous, current, scale)
      .is_some_and(|d| d < self.config.gate.lower);
    if !still {
      state.rest_since = None;
      return;
    }
    let since = *state.rest_since.get_or_insert(now);

    if let Some(rest) = self.config.rest_rebaseline {
      if state.gate.has_committed() && now.saturating_sub(since) >= rest {
        debug!("翻身后姿态已静止 {:?}, 以当前姿态为新基准", rest);
        state.baseline = *current;
        state.rest_since = None;
      }
    }
  }
}
