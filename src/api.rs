// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/api.rs - 检测服务接口定义
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

use std::{future::Future, sync::Arc};

use thiserror::Error;

use crate::{
  analytics::AnalyticsQuery,
  history::HistoryQuery,
  media::LocalFile,
  model::{AnalyticsReport, HistoryPage, UploadResult},
  session::SessionError,
};

#[cfg(feature = "http_api")]
mod http;
#[cfg(feature = "http_api")]
pub use self::http::HttpApi;

/// 上传表单中文件字段的名称
pub const UPLOAD_FIELD: &str = "file";

pub const UPLOAD_ENDPOINT: &str = "upload";
pub const HISTORY_ENDPOINT: &str = "history";
pub const ANALYTICS_ENDPOINT: &str = "analytics";

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("服务端返回错误 {status}: {}", .detail.as_deref().unwrap_or("无详细信息"))]
  Remote { status: u16, detail: Option<String> },
  #[cfg(feature = "http_api")]
  #[error("HTTP 传输错误: {0}")]
  TransportError(#[from] reqwest::Error),
  #[error("响应解析错误: {0}")]
  DecodeError(#[from] serde_json::Error),
  #[error("URL 错误: {0}")]
  UrlError(#[from] url::ParseError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl ApiError {
  /// 服务端给出的结构化错误信息
  pub fn detail(&self) -> Option<&str> {
    match self {
      ApiError::Remote { detail, .. } => detail.as_deref(),
      _ => None,
    }
  }
}

/// 远程检测服务
pub trait DetectionApi {
  fn upload(
    &self,
    token: &str,
    file: &LocalFile,
  ) -> impl Future<Output = Result<UploadResult, ApiError>> + Send;

  fn history(
    &self,
    token: &str,
    query: &HistoryQuery,
  ) -> impl Future<Output = Result<HistoryPage, ApiError>> + Send;

  fn analytics(
    &self,
    token: &str,
    query: &AnalyticsQuery,
  ) -> impl Future<Output = Result<AnalyticsReport, ApiError>> + Send;
}

impl<T: DetectionApi + Send + Sync> DetectionApi for Arc<T> {
  fn upload(
    &self,
    token: &str,
    file: &LocalFile,
  ) -> impl Future<Output = Result<UploadResult, ApiError>> + Send {
    (**self).upload(token, file)
  }

  fn history(
    &self,
    token: &str,
    query: &HistoryQuery,
  ) -> impl Future<Output = Result<HistoryPage, ApiError>> + Send {
    (**self).history(token, query)
  }

  fn analytics(
    &self,
    token: &str,
    query: &AnalyticsQuery,
  ) -> impl Future<Output = Result<AnalyticsReport, ApiError>> + Send {
    (**self).analytics(token, query)
  }
}

/// 历史与统计查询的失败原因
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("当前没有已登录用户")]
  NotSignedIn,
  #[error("获取令牌失败: {0}")]
  AuthError(#[from] SessionError),
  #[error(transparent)]
  ApiError(#[from] ApiError),
}

impl FetchError {
  /// 可展示的错误信息：优先使用服务端的 `detail`
  pub fn user_message(&self, fallback: &str) -> String {
    match self {
      FetchError::ApiError(e) => e.detail().unwrap_or(fallback).to_string(),
      _ => fallback.to_string(),
    }
  }
}
