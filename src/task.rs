// 该文件是 Fanshen （翻身） 项目的一部分。
// src/task.rs - 推理与体动检测任务循环
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

use std::{
  sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
    mpsc,
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
  frame::Frame, model::Model, output::Render, session::FrameReport, session::MonitorSession,
  session::log_decode_error, tensor::Tensor,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// 进程内只注册一次 Ctrl-C 处理
fn interrupt_flag() -> anyhow::Result<Arc<AtomicBool>> {
  if let Some(flag) = INTERRUPTED.get() {
    return Ok(flag.clone());
  }
  let flag = Arc::new(AtomicBool::new(false));
  let handler_flag = flag.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    handler_flag.store(true, Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(INTERRUPTED.get_or_init(|| flag).clone())
}

#[derive(Debug, Clone)]
struct LoopControl {
  frame_number: Option<usize>,
  interval: Duration,
}

impl Default for LoopControl {
  fn default() -> Self {
    Self {
      frame_number: None,
      interval: Duration::from_secs(1),
    }
  }
}

impl LoopControl {
  fn reached(&self, frame_index: usize) -> bool {
    self.frame_number.map(|n| frame_index >= n).unwrap_or(false)
  }
}

/// 解码、体动更新与输出，失败只记录日志
fn handle_inference<O, RE>(
  session: &mut MonitorSession,
  output: &O,
  frame: &Frame,
  tensor: &Tensor,
  now: Duration,
) -> Option<FrameReport>
where
  O: Render<Frame, FrameReport, Error = RE>,
  RE: std::fmt::Display,
{
  let report = match session.process(tensor, now) {
    Ok(report) => report,
    Err(err) => {
      log_decode_error(&err);
      return None;
    }
  };
  if let Some(motion) = &report.motion {
    debug!(
      "体动: {:.3}, 翻身: {}, 累计: {}",
      motion.movement, motion.is_turn, motion.turns
    );
  }
  if let Err(err) = output.render_result(frame, &report) {
    warn!("输出失败: {}", err);
  }
  Some(report)
}

/// 串行处理：取帧、推理、解码、更新状态，按固定间隔采样
#[derive(Debug, Clone, Default)]
pub struct ContinuousTask {
  session: MonitorSession,
  control: LoopControl,
}

impl ContinuousTask {
  pub fn new(session: MonitorSession) -> Self {
    Self {
      session,
      control: LoopControl::default(),
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.control.frame_number = frame_number;
    self
  }

  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.control.interval = interval;
    self
  }

  pub fn session(&self) -> &MonitorSession {
    &self.session
  }

  fn run<I, M, O, ME, RE>(&mut self, input: I, model: &M, output: &O) -> anyhow::Result<usize>
  where
    I: Iterator<Item = Frame>,
    M: Model<Input = Frame, Output = Tensor, Error = ME>,
    O: Render<Frame, FrameReport, Error = RE>,
    ME: std::fmt::Display,
    RE: std::fmt::Display,
  {
    let interrupted = interrupt_flag()?;
    let start = Instant::now();
    let mut frame_index = 0;

    for frame in input {
      frame_index += 1;
      let now = start.elapsed();
      info!("处理第 {} 帧图像", frame_index);

      let tick = Instant::now();
      match model.infer(&frame) {
        Ok(tensor) => {
          let elapsed = tick.elapsed();
          handle_inference(&mut self.session, output, &frame, &tensor, now);
          info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed, tick.elapsed());
        }
        Err(err) => warn!("推理失败，跳过该帧: {}", err),
      }

      if self.control.reached(frame_index) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupted.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      if let Some(rest) = self.control.interval.checked_sub(tick.elapsed()) {
        thread::sleep(rest);
      }
    }

    Ok(frame_index)
  }
}

impl<I, M, O, ME, RE> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = Frame>,
  M: Model<Input = Frame, Output = Tensor, Error = ME>,
  O: Render<Frame, FrameReport, Error = RE>,
  ME: std::fmt::Display,
  RE: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(mut self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frames = self.run(input, &model, &output)?;
    info!("任务完成，共处理 {} 帧，翻身 {} 次", frames, self.session.turns());
    Ok(())
  }
}

/// 取帧与推理放在工作线程，解码与状态更新仍在当前线程串行执行
#[derive(Debug, Clone, Default)]
pub struct PipelinedTask {
  session: MonitorSession,
  control: LoopControl,
}

impl PipelinedTask {
  pub fn new(session: MonitorSession) -> Self {
    Self {
      session,
      control: LoopControl::default(),
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.control.frame_number = frame_number;
    self
  }

  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.control.interval = interval;
    self
  }
}

impl<I, M, O, ME, RE> Task<I, M, O> for PipelinedTask
where
  I: Iterator<Item = Frame> + Send,
  M: Model<Input = Frame, Output = Tensor, Error = ME> + Send,
  O: Render<Frame, FrameReport, Error = RE>,
  ME: std::fmt::Display,
  RE: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(mut self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始流水线任务...");
    let interrupted = interrupt_flag()?;
    let start = Instant::now();
    let control = self.control.clone();
    let (tx, rx) = mpsc::sync_channel::<(Frame, Tensor, Duration)>(1);

    let frames = thread::scope(|scope| {
      let worker_flag = interrupted.clone();
      scope.spawn(move || {
        let mut frame_index = 0;
        for frame in input {
          frame_index += 1;
          let tick = Instant::now();
          let now = start.elapsed();
          match model.infer(&frame) {
            Ok(tensor) => {
              debug!("({})推理完成，耗时: {:.2?}", frame_index, tick.elapsed());
              if tx.send((frame, tensor, now)).is_err() {
                break;
              }
            }
            Err(err) => warn!("推理失败，跳过该帧: {}", err),
          }
          if control.reached(frame_index) || worker_flag.load(Ordering::SeqCst) {
            break;
          }
          if let Some(rest) = control.interval.checked_sub(tick.elapsed()) {
            thread::sleep(rest);
          }
        }
      });

      // 发送端随工作线程结束而关闭
      let mut handled = 0usize;
      for (frame, tensor, now) in rx.iter() {
        handled += 1;
        info!("处理第 {} 帧推理结果", handled);
        handle_inference(&mut self.session, &output, &frame, &tensor, now);
        if interrupted.load(Ordering::SeqCst) {
          warn!("中断信号接收，退出任务循环");
          break;
        }
      }
      handled
    });

    info!("任务完成，共处理 {} 帧，翻身 {} 次", frames, self.session.turns());
    Ok(())
  }
}
