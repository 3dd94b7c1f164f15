// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/annotate.rs - 检测结果标注
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  media::{MediaError, PreviewSource},
  model::{Detection, UploadResult},
};

#[cfg(feature = "raster_canvas")]
mod raster;
#[cfg(feature = "raster_canvas")]
pub use self::raster::{FontError, RasterCanvas};

/// 标签文字基线相对检测框上边的偏移
pub const LABEL_OFFSET: f64 = 5.0;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("预览图像解码失败: {0}")]
  MediaError(#[from] MediaError),
  #[error("解码任务异常退出: {0}")]
  TaskError(#[from] tokio::task::JoinError),
}

/// 绘制表面，坐标为像素坐标，原点在左上角
pub trait Canvas {
  /// 调整画布尺寸并清空内容
  fn resize(&mut self, width: u32, height: u32);

  fn draw_image(&mut self, image: &RgbImage, x: i32, y: i32);

  /// 描边矩形 `(x_min, y_min)` - `(x_max, y_max)`
  fn stroke_rect(&mut self, x_min: f64, y_min: f64, x_max: f64, y_max: f64);

  /// 在 `(x, y)` 处绘制文字，`y` 为文字基线
  fn fill_text(&mut self, text: &str, x: f64, y: f64);
}

/// 在画布上绘制原图与检测框，画布尺寸与原图像素尺寸一致
pub fn paint_detections<C: Canvas + ?Sized>(canvas: &mut C, image: &RgbImage, detections: &[Detection]) {
  canvas.resize(image.width(), image.height());
  canvas.draw_image(image, 0, 0);

  for detection in detections {
    let [x_min, y_min, x_max, y_max] = detection.bbox;
    canvas.stroke_rect(x_min, y_min, x_max, y_max);
    canvas.fill_text(&detection.label_text(), x_min, y_min - LABEL_OFFSET);
  }
}

/// 异步解码预览图像，不阻塞调用方
pub async fn decode_preview(preview: &PreviewSource) -> Result<RgbImage, DecodeError> {
  let preview = preview.clone();
  let image = tokio::task::spawn_blocking(move || preview.decode()).await??;
  debug!("预览图像解码完成: {}x{}", image.width(), image.height());
  Ok(image)
}

/// 解码预览并绘制检测结果；解码失败时不修改画布
pub async fn render_annotation<C: Canvas + ?Sized>(
  canvas: &mut C,
  preview: &PreviewSource,
  result: &UploadResult,
) -> Result<(), DecodeError> {
  let image = decode_preview(preview).await.inspect_err(|e| {
    error!("无法绘制检测结果: {}", e);
  })?;
  paint_detections(canvas, &image, &result.detections);
  Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::media::{LocalFile, MIME_PNG, tests::encode_png};

  #[derive(Debug, Clone, PartialEq)]
  pub(crate) enum DrawOp {
    Resize(u32, u32),
    Image(u32, u32, i32, i32),
    Rect(f64, f64, f64, f64),
    Text(String, f64, f64),
  }

  /// 记录绘制调用的画布
  #[derive(Debug, Default)]
  pub(crate) struct RecordingCanvas {
    pub(crate) ops: Vec<DrawOp>,
  }

  impl Canvas for RecordingCanvas {
    fn resize(&mut self, width: u32, height: u32) {
      self.ops.clear();
      self.ops.push(DrawOp::Resize(width, height));
    }

    fn draw_image(&mut self, image: &RgbImage, x: i32, y: i32) {
      self.ops.push(DrawOp::Image(image.width(), image.height(), x, y));
    }

    fn stroke_rect(&mut self, x_min: f64, y_min: f64, x_max: f64, y_max: f64) {
      self.ops.push(DrawOp::Rect(x_min, y_min, x_max, y_max));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
      self.ops.push(DrawOp::Text(text.to_string(), x, y));
    }
  }

  fn helmet() -> Detection {
    Detection {
      label: "helmet".into(),
      confidence: 0.87,
      bbox: [10.0, 20.0, 110.0, 220.0],
    }
  }

  #[test]
  fn paints_image_then_boxes_in_order() {
    let image = RgbImage::new(320, 240);
    let vest = Detection {
      label: "vest".into(),
      confidence: 0.5,
      bbox: [1.0, 2.0, 3.0, 4.0],
    };
    let mut canvas = RecordingCanvas::default();
    paint_detections(&mut canvas, &image, &[helmet(), vest]);

    assert_eq!(
      canvas.ops,
      vec![
        DrawOp::Resize(320, 240),
        DrawOp::Image(320, 240, 0, 0),
        DrawOp::Rect(10.0, 20.0, 110.0, 220.0),
        DrawOp::Text("helmet (87.00%)".into(), 10.0, 15.0),
        DrawOp::Rect(1.0, 2.0, 3.0, 4.0),
        DrawOp::Text("vest (50.00%)".into(), 1.0, -3.0),
      ]
    );
  }

  #[tokio::test]
  async fn render_sizes_canvas_to_decoded_image() {
    let preview = PreviewSource::from_file(&LocalFile::new("a.png", MIME_PNG, encode_png(64, 48)));
    let result = UploadResult {
      detections: vec![helmet()],
      ..UploadResult::default()
    };
    let mut canvas = RecordingCanvas::default();
    render_annotation(&mut canvas, &preview, &result).await.unwrap();
    assert_eq!(canvas.ops[0], DrawOp::Resize(64, 48));
    assert_eq!(canvas.ops.len(), 4);
  }

  #[tokio::test]
  async fn decode_failure_leaves_canvas_untouched() {
    let mut canvas = RecordingCanvas {
      ops: vec![DrawOp::Resize(1, 1)],
    };
    let corrupt = PreviewSource::from_file(&LocalFile::new("a.png", MIME_PNG, vec![0u8; 16]));
    let err = render_annotation(&mut canvas, &corrupt, &UploadResult::default()).await;
    assert!(matches!(err, Err(DecodeError::MediaError(_))));
    assert_eq!(canvas.ops, vec![DrawOp::Resize(1, 1)]);
  }
}
