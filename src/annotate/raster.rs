// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/annotate/raster.rs - 位图画布
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage, imageops};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::debug;

use crate::annotate::Canvas;

// 内置默认字体
const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const STROKE_WIDTH: i32 = 2;
const STROKE_COLOR: [u8; 3] = [255, 0, 0]; // 红色

#[derive(thiserror::Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体格式错误: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 基于 `RgbImage` 的画布
pub struct RasterCanvas {
  image: RgbImage,
  font: FontArc,
  font_scale: PxScale,
  color: Rgb<u8>,
  stroke_width: i32,
}

impl RasterCanvas {
  pub fn new(font: FontArc) -> Self {
    Self {
      image: RgbImage::new(0, 0),
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      color: Rgb(STROKE_COLOR),
      stroke_width: STROKE_WIDTH,
    }
  }

  /// 使用内置的 DejaVu Sans 字体
  pub fn with_default_font() -> Result<Self, FontError> {
    Ok(Self::new(FontArc::try_from_slice(DEFAULT_FONT)?))
  }

  pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    debug!("加载字体: {}", path.display());
    Ok(Self::new(font))
  }

  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = Rgb(color);
    self
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_image(self) -> RgbImage {
    self.image
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    self.image.save(path)?;
    debug!("保存标注图像到文件: {}", path.display());
    Ok(())
  }
}

impl Canvas for RasterCanvas {
  fn resize(&mut self, width: u32, height: u32) {
    self.image = RgbImage::new(width, height);
  }

  fn draw_image(&mut self, image: &RgbImage, x: i32, y: i32) {
    imageops::replace(&mut self.image, image, x as i64, y as i64);
  }

  fn stroke_rect(&mut self, x_min: f64, y_min: f64, x_max: f64, y_max: f64) {
    let x = x_min.round() as i32;
    let y = y_min.round() as i32;
    let width = (x_max - x_min).round() as i32;
    let height = (y_max - y_min).round() as i32;

    // 边框向内加粗
    for thickness in 0..self.stroke_width {
      let w = width - 2 * thickness;
      let h = height - 2 * thickness;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(x + thickness, y + thickness).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(&mut self.image, rect, self.color);
    }
  }

  fn fill_text(&mut self, text: &str, x: f64, y: f64) {
    // imageproc 以文字顶部定位，基线向上移一个字号
    let top = (y - f64::from(self.font_scale.y)).max(0.0) as i32;
    let left = x.max(0.0) as i32;
    draw_text_mut(&mut self.image, self.color, left, top, self.font_scale, &self.font, text);
  }
}
