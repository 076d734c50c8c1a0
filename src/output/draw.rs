// 该文件是 Fanshen （翻身） 项目的一部分。
// src/output/draw.rs - 姿态检测结果可视化
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

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut},
  rect::Rect,
};

use crate::{
  frame::Frame,
  pose::{Detection, Keypoint, SKELETON_EDGES},
};

// 绘制常量
const KEYPOINT_RADIUS: i32 = 3;
const KEYPOINT_VISIBILITY: f32 = 0.2;
const BBOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BONE_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const KEYPOINT_COLOR: [u8; 3] = [255, 0, 0]; // 红色

pub struct Draw {
  keypoint_radius: i32,
  visibility: f32,
  bbox_color: [u8; 3],
  bone_color: [u8; 3],
  keypoint_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      keypoint_radius: KEYPOINT_RADIUS,
      visibility: KEYPOINT_VISIBILITY,
      bbox_color: BBOX_COLOR,
      bone_color: BONE_COLOR,
      keypoint_color: KEYPOINT_COLOR,
    }
  }
}

/// 模型坐标可能是 [0,1] 归一化，也可能是像素坐标：两轴都不大于 1 时按归一化处理
fn canvas_scale(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
  if x <= 1.0 && y <= 1.0 {
    (width as f32, height as f32)
  } else {
    (1.0, 1.0)
  }
}

fn to_canvas(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
  let (sx, sy) = canvas_scale(x, y, width, height);
  (x * sx, y * sy)
}

impl Draw {
  fn draw_bbox(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width(), image.height());
    let [x_min, y_min, x_max, y_max] = detection.bbox.corners();
    // 整个框使用同一种坐标单位，以右下角为准
    let (sx, sy) = canvas_scale(x_max, y_max, w, h);
    let (x_min, y_min) = (x_min.max(0.0) * sx, y_min.max(0.0) * sy);
    let (x_max, y_max) = (x_max * sx, y_max * sy);

    let x = (x_min.floor() as i32).clamp(0, w as i32 - 1);
    let y = (y_min.floor() as i32).clamp(0, h as i32 - 1);
    let right = (x_max.ceil() as i32).clamp(0, w as i32 - 1);
    let bottom = (y_max.ceil() as i32).clamp(0, h as i32 - 1);

    if x >= right || y >= bottom {
      return;
    }

    let rect = Rect::at(x, y).of_size((right - x) as u32, (bottom - y) as u32);
    draw_hollow_rect_mut(image, rect, Rgb(self.bbox_color));
  }

  fn draw_skeleton(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width(), image.height());
    let visible = |kp: &Keypoint| kp.is_visible(self.visibility);

    // 骨架连线
    for (a, b) in SKELETON_EDGES {
      let (kp1, kp2) = (detection.keypoint(a), detection.keypoint(b));
      if !visible(kp1) || !visible(kp2) {
        continue;
      }
      let start = to_canvas(kp1.x, kp1.y, w, h);
      let end = to_canvas(kp2.x, kp2.y, w, h);
      draw_line_segment_mut(image, start, end, Rgb(self.bone_color));
    }

    // 关节点
    for kp in detection.keypoints.iter().filter(|kp| visible(kp)) {
      let (cx, cy) = to_canvas(kp.x, kp.y, w, h);
      draw_filled_circle_mut(
        image,
        (cx.round() as i32, cy.round() as i32),
        self.keypoint_radius,
        Rgb(self.keypoint_color),
      );
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      self.draw_bbox(image, detection);
      self.draw_skeleton(image, detection);
    }
  }

  pub fn draw_detection(&self, frame: &Frame, detections: &[Detection]) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_detections_on_image(&mut image, detections);
    image
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl ToRgbImage for Frame {
  fn to_rgb_image(&self) -> RgbImage {
    ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      Rgb(self.rgb_at(x as usize, y as usize))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pose::{BoundingBox, KeypointIndex, NUM_KEYPOINTS};

  #[test]
  fn test_to_canvas_normalized_and_pixel() {
    assert_eq!(to_canvas(0.5, 0.25, 640, 480), (320.0, 120.0));
    assert_eq!(to_canvas(320.0, 0.5, 640, 480), (320.0, 0.5));
  }

  #[test]
  fn test_draw_marks_visible_keypoints_only() {
    let frame = Frame::rgb(32, 32, vec![0; 32 * 32 * 3]).unwrap();
    let mut keypoints = [Keypoint::new(5.0, 5.0, 0.0); NUM_KEYPOINTS];
    keypoints[KeypointIndex::Nose as usize] = Keypoint::new(16.0, 16.0, 0.9);
    let detection = Detection {
      bbox: BoundingBox {
        cx: 16.0,
        cy: 16.0,
        width: 20.0,
        height: 20.0,
        score: 0.9,
        class_id: 0,
      },
      keypoints,
    };

    let image = Draw::default().draw_detection(&frame, &[detection]);
    assert_eq!(image.get_pixel(16, 16), &Rgb(KEYPOINT_COLOR));
    assert_eq!(image.get_pixel(5, 5), &Rgb([0, 0, 0]));
    assert_eq!(image.get_pixel(6, 6), &Rgb(BBOX_COLOR));
  }

  fn boxed(cx: f32, cy: f32, size: f32) -> Detection {
    Detection {
      bbox: BoundingBox {
        cx,
        cy,
        width: size,
        height: size,
        score: 0.9,
        class_id: 0,
      },
      keypoints: [Keypoint::new(0.0, 0.0, 0.0); NUM_KEYPOINTS],
    }
  }

  #[test]
  fn test_bbox_uses_one_unit_for_both_corners() {
    let frame = Frame::rgb(32, 32, vec![0; 32 * 32 * 3]).unwrap();
    let draw = Draw::default();

    // 右下角超过 1，整个框按像素处理
    let image = draw.draw_detection(&frame, &[boxed(1.0, 1.0, 0.5)]);
    assert_eq!(image.get_pixel(0, 0), &Rgb(BBOX_COLOR));
    assert_eq!(image.get_pixel(24, 24), &Rgb([0, 0, 0]));

    let image = draw.draw_detection(&frame, &[boxed(0.5, 0.5, 0.5)]);
    assert_eq!(image.get_pixel(8, 8), &Rgb(BBOX_COLOR));
    assert_eq!(image.get_pixel(23, 23), &Rgb(BBOX_COLOR));
  }
}
