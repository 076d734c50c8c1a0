// 该文件是 Fanshen （翻身） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{DynamicImage, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Frame error: {0}")]
  FrameError(#[from] FrameError),
}

/// 将解码后的图像缩放为模型输入尺寸的 RGB 帧
pub(crate) fn image_to_frame<const W: u32, const H: u32>(
  image: DynamicImage,
) -> Result<Frame, FrameError> {
  let image = if image.width() != W || image.height() != H {
    debug!("缩放图像 {}x{} -> {}x{}", image.width(), image.height(), W, H);
    image.resize_exact(W, H, FilterType::Triangle)
  } else {
    image
  };
  Frame::rgb(W as usize, H as usize, image.to_rgb8().into_raw())
}

/// 单张图像，只产出一帧
pub struct ImageFileInput<const W: u32, const H: u32> {
  frame: Option<Frame>,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let image = ImageReader::open(url.path())?.decode()?;
    Ok(ImageFileInput {
      frame: Some(image_to_frame::<W, H>(image)?),
    })
  }
}

impl<const W: u32, const H: u32> Iterator for ImageFileInput<W, H> {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn test_image_to_frame_resizes() {
    let image = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
    let frame = image_to_frame::<4, 2>(DynamicImage::ImageRgb8(image)).unwrap();
    assert_eq!((frame.width(), frame.height(), frame.channels()), (4, 2, 3));
    assert_eq!(frame.rgb_at(3, 1), [10, 20, 30]);
  }
}
