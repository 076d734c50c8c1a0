// 该文件是 Fanshen （翻身） 项目的一部分。
// src/model/onnx.rs - 基于 tract 的 ONNX 姿态模型推理
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, model::Model, query_value, tensor::Tensor};

const POSE_ONNX_DEFAULT_SIZE: usize = 640;
const POSE_ONNX_OUTPUT_NAME: &str = "output0";

type PosePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Error, Debug)]
pub enum PoseOnnxError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(TractError),
  #[error("推理错误: {0}")]
  InferenceError(TractError),
  #[error("帧尺寸 {frame_w}x{frame_h} 与模型输入 {model_w}x{model_h} 不一致")]
  SizeMismatch {
    frame_w: usize,
    frame_h: usize,
    model_w: usize,
    model_h: usize,
  },
  #[error("模型没有输出")]
  MissingOutput,
}

pub struct PoseOnnxBuilder {
  model_path: PathBuf,
  width: usize,
  height: usize,
}

impl FromUrlWithScheme for PoseOnnxBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for PoseOnnxBuilder {
  type Error = PoseOnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(PoseOnnxError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(PoseOnnxBuilder {
      model_path: PathBuf::from(url.path()),
      width: query_value(url, "width", POSE_ONNX_DEFAULT_SIZE),
      height: query_value(url, "height", POSE_ONNX_DEFAULT_SIZE),
    })
  }
}

impl PoseOnnxBuilder {
  /// 输入源只能产出固定尺寸的帧，URL 中指定的尺寸必须与之一致
  pub fn require_input_size(self, width: usize, height: usize) -> Result<Self, PoseOnnxError> {
    if (self.width, self.height) != (width, height) {
      return Err(PoseOnnxError::SizeMismatch {
        frame_w: width,
        frame_h: height,
        model_w: self.width,
        model_h: self.height,
      });
    }
    Ok(self)
  }

  pub fn build(self) -> Result<PoseOnnx, PoseOnnxError> {
    info!("加载模型文件: {}", self.model_path.display());
    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .and_then(|model| {
        model.with_input_fact(
          0,
          InferenceFact::dt_shape(f32::datum_type(), vec![1, 3, self.height, self.width]),
        )
      })
      .and_then(|model| model.into_optimized())
      .and_then(|model| model.into_runnable())
      .map_err(PoseOnnxError::ModelLoadError)?;

    let output_index = plan
      .model()
      .output_outlets()
      .map_err(PoseOnnxError::ModelLoadError)?
      .iter()
      .position(|outlet| plan.model().outlet_label(*outlet) == Some(POSE_ONNX_OUTPUT_NAME))
      .unwrap_or(0);
    debug!("使用第 {} 个模型输出", output_index);
    info!("模型加载完成, 输入尺寸 {}x{}", self.width, self.height);

    Ok(PoseOnnx {
      plan,
      width: self.width,
      height: self.height,
      output_index,
    })
  }
}

/// YOLOv8-pose ONNX 模型，输出原始 `[1, 56, N]` / `[1, N, 56]` 张量
pub struct PoseOnnx {
  plan: PosePlan,
  width: usize,
  height: usize,
  output_index: usize,
}

impl PoseOnnx {
  pub fn input_size(&self) -> (usize, usize) {
    (self.width, self.height)
  }
}

impl Model for PoseOnnx {
  type Input = Frame;
  type Output = Tensor;
  type Error = PoseOnnxError;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    if frame.width() != self.width || frame.height() != self.height {
      return Err(PoseOnnxError::SizeMismatch {
        frame_w: frame.width(),
        frame_h: frame.height(),
        model_w: self.width,
        model_h: self.height,
      });
    }

    let input = frame.to_input_tensor();
    let input = tract_onnx::prelude::Tensor::from_shape(input.shape(), input.data())
      .map_err(PoseOnnxError::InferenceError)?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(input.into()))
      .map_err(PoseOnnxError::InferenceError)?;

    let output = outputs
      .get(self.output_index)
      .ok_or(PoseOnnxError::MissingOutput)?;
    let view = output
      .to_array_view::<f32>()
      .map_err(PoseOnnxError::InferenceError)?;
    debug!("模型输出形状: {:?}", view.shape());

    Ok(Tensor::from_raw(
      view.iter().copied().collect(),
      view.shape().to_vec(),
    ))
  }
}
