// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/media.rs - 本地媒体文件与预览源
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

use std::{borrow::Cow, path::Path, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use thiserror::Error;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_MP4: &str = "video/mp4";
pub const MIME_AVI: &str = "video/avi";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

const IMAGE_MIMES: [&str; 2] = [MIME_JPEG, MIME_PNG];
const VIDEO_MIMES: [&str; 2] = [MIME_MP4, MIME_AVI];

#[derive(Error, Debug)]
pub enum MediaError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Base64 解码错误: {0}")]
  Base64Error(#[from] base64::DecodeError),
  #[error("图像解码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("不是可解码的图像: {0}")]
  NotRaster(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
  Image,
  Video,
}

/// 文件接收策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptPolicy {
  /// 仅接收 JPEG/PNG 图片
  ImagesOnly,
  /// 接收 JPEG/PNG 图片与 MP4/AVI 视频
  #[default]
  ImagesAndVideos,
}

impl AcceptPolicy {
  /// 按声明的 MIME 类型判断是否接收，返回媒体种类
  pub fn classify(&self, mime: &str) -> Option<MediaKind> {
    let mime = mime.trim().to_ascii_lowercase();
    if IMAGE_MIMES.contains(&mime.as_str()) {
      return Some(MediaKind::Image);
    }
    match self {
      AcceptPolicy::ImagesAndVideos if VIDEO_MIMES.contains(&mime.as_str()) => Some(MediaKind::Video),
      _ => None,
    }
  }
}

/// 根据扩展名推断 MIME 类型
pub fn mime_from_extension(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| ext.to_ascii_lowercase());
  match ext.as_deref() {
    Some("jpg") | Some("jpeg") => MIME_JPEG,
    Some("png") => MIME_PNG,
    Some("mp4") => MIME_MP4,
    Some("avi") => MIME_AVI,
    _ => MIME_UNKNOWN,
  }
}

/// 用户选择的本地文件，仅保存在内存中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
  name: String,
  mime: String,
  bytes: Arc<[u8]>,
}

impl LocalFile {
  pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
    Self {
      name: name.into(),
      mime: mime.into(),
      bytes: bytes.into(),
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    Ok(Self::new(name, mime_from_extension(path), bytes))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

/// 可展示的预览源，同一时刻只有一个有效
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
  /// 来自本地文件的原始字节
  LocalBlob { mime: String, bytes: Arc<[u8]> },
  /// 服务端返回的 base64 编码图像
  DataUri { mime: String, encoded: String },
}

impl PreviewSource {
  pub fn from_file(file: &LocalFile) -> Self {
    PreviewSource::LocalBlob {
      mime: file.mime.clone(),
      bytes: file.bytes.clone(),
    }
  }

  /// 由服务端返回的 base64 图像构造，MIME 类型依据数据头部推测
  pub fn from_base64(encoded: impl Into<String>) -> Self {
    let encoded: String = encoded.into();
    let mime = STANDARD
      .decode(encoded.as_bytes())
      .ok()
      .and_then(|bytes| image::guess_format(&bytes).ok())
      .map(|format| format.to_mime_type())
      .unwrap_or(MIME_PNG);
    PreviewSource::DataUri {
      mime: mime.to_string(),
      encoded,
    }
  }

  pub fn mime(&self) -> &str {
    match self {
      PreviewSource::LocalBlob { mime, .. } | PreviewSource::DataUri { mime, .. } => mime,
    }
  }

  pub fn is_image(&self) -> bool {
    self.mime().starts_with("image/")
  }

  pub fn bytes(&self) -> Result<Cow<'_, [u8]>, MediaError> {
    match self {
      PreviewSource::LocalBlob { bytes, .. } => Ok(Cow::Borrowed(&bytes[..])),
      PreviewSource::DataUri { encoded, .. } => Ok(Cow::Owned(STANDARD.decode(encoded.as_bytes())?)),
    }
  }

  /// 以 data URI 形式表示，供外部展示
  pub fn to_uri(&self) -> String {
    match self {
      PreviewSource::LocalBlob { mime, bytes } => {
        format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
      }
      PreviewSource::DataUri { mime, encoded } => format!("data:{};base64,{}", mime, encoded),
    }
  }

  /// 解码为 RGB 图像，尺寸为图像原始像素尺寸
  pub fn decode(&self) -> Result<RgbImage, MediaError> {
    if !self.is_image() {
      return Err(MediaError::NotRaster(self.mime().to_string()));
    }
    let bytes = self.bytes()?;
    let image = match ImageFormat::from_mime_type(self.mime()) {
      Some(format) => image::load_from_memory_with_format(&bytes, format)
        .or_else(|_| image::load_from_memory(&bytes))?,
      None => image::load_from_memory(&bytes)?,
    };
    Ok(image.into_rgb8())
  }
}
