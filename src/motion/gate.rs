// 该文件是 Fanshen （翻身） 项目的一部分。
// src/motion/gate.rs - 带迟滞、驻留与不应期的翻身判定状态机
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
  /// 进入 `Turning` 的上阈值（体尺度单位）
  pub upper: f32,
  /// 退回 `Settled` 的下阈值，必须小于 `upper`
  pub lower: f32,
  /// 超过上阈值需持续的时间
  pub dwell: Duration,
  /// 提交一次翻身后禁止开始新一轮的时间
  pub refractory: Duration,
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      upper: 1.0,
      lower: 0.4,
      dwell: Duration::from_millis(300),
      refractory: Duration::from_millis(500),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
  #[default]
  Settled,
  Turning {
    /// 当前超阈值区段的起点，落入迟滞带后清空
    onset: Option<Duration>,
    /// 本轮是否已经计数
    committed: bool,
  },
}

/// 单次状态机推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateStep {
  pub entered: bool,
  pub committed: bool,
  pub settled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TurnGate {
  phase: TurnPhase,
  last_sample: Option<Duration>,
  last_turn_at: Option<Duration>,
}

impl TurnGate {
  pub fn phase(&self) -> TurnPhase {
    self.phase
  }

  pub fn is_settled(&self) -> bool {
    self.phase == TurnPhase::Settled
  }

  /// 本轮 `Turning` 是否已经提交过翻身
  pub fn has_committed(&self) -> bool {
    matches!(self.phase, TurnPhase::Turning { committed: true, .. })
  }

  pub fn last_turn_at(&self) -> Option<Duration> {
    self.last_turn_at
  }

  fn in_refractory(&self, config: &GateConfig, now: Duration) -> bool {
    self
      .last_turn_at
      .is_some_and(|at| now.saturating_sub(at) < config.refractory)
  }

  /// 超阈值区段的起点：上一次观测与本次间隔短于驻留时间时，
  /// 认为穿越发生在上一次观测之后
  fn onset(&self, config: &GateConfig, prev: Option<Duration>, now: Duration) -> Duration {
    match prev {
      Some(prev) if now.saturating_sub(prev) < config.dwell => prev,
      _ => now,
    }
  }

  pub fn step(&mut self, config: &GateConfig, movement: f32, now: Duration) -> GateStep {
    let prev = self.last_sample.replace(now);
    let above = movement >= config.upper;
    let mut step = GateStep::default();

    match self.phase {
      TurnPhase::Settled => {
        if above && !self.in_refractory(config, now) {
          self.phase = TurnPhase::Turning {
            onset: Some(self.onset(config, prev, now)),
            committed: false,
          };
          step.entered = true;
        }
      }
      TurnPhase::Turning { onset, committed } => {
        if movement < config.lower {
          self.phase = TurnPhase::Settled;
          step.settled = true;
          return step;
        }

        let onset = if above {
          onset.or_else(|| Some(self.onset(config, prev, now)))
        } else {
          None
        };
        self.phase = TurnPhase::Turning { onset, committed };
      }
    }

    if let TurnPhase::Turning {
      onset: Some(onset),
      committed: false,
    } = self.phase
    {
      if above && now.saturating_sub(onset) >= config.dwell {
        self.phase = TurnPhase::Turning {
          onset: Some(onset),
          committed: true,
        };
        self.last_turn_at = Some(now);
        step.committed = true;
      }
    }

    step
  }
}
