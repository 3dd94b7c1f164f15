// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/workflow.rs - 上传与标注流程
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

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  annotate::{Canvas, DecodeError, render_annotation},
  api::{ApiError, DetectionApi},
  media::{AcceptPolicy, LocalFile, MediaKind, PreviewSource},
  model::UploadResult,
  session::{Session, SessionError},
};

pub const NO_FILE_MESSAGE: &str = "No file selected.";
pub const UNSUPPORTED_MEDIA_MESSAGE: &str = "Please upload an image (JPEG/PNG) or video (MP4, AVI).";
pub const UNSUPPORTED_IMAGE_MESSAGE: &str = "Please upload an image (JPEG/PNG).";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
pub const RENDER_FAILED_MESSAGE: &str = "Unable to display the detection result.";

fn unsupported_message(policy: &AcceptPolicy) -> &'static str {
  match policy {
    AcceptPolicy::ImagesOnly => UNSUPPORTED_IMAGE_MESSAGE,
    AcceptPolicy::ImagesAndVideos => UNSUPPORTED_MEDIA_MESSAGE,
  }
}

/// 本地校验错误，不会触发网络请求
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("{}", unsupported_message(.policy))]
  UnsupportedMedia { mime: String, policy: AcceptPolicy },
  #[error("{}", NO_FILE_MESSAGE)]
  NoFileSelected,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("获取令牌失败: {0}")]
  AuthError(#[from] SessionError),
  #[error(transparent)]
  RemoteError(#[from] ApiError),
  #[error(transparent)]
  DecodeError(#[from] DecodeError),
}

impl WorkflowError {
  /// 展示给用户的错误信息
  pub fn user_message(&self) -> String {
    match self {
      WorkflowError::Validation(e) => e.to_string(),
      WorkflowError::AuthError(_) => UPLOAD_FAILED_MESSAGE.to_string(),
      WorkflowError::RemoteError(e) => e.detail().unwrap_or(UPLOAD_FAILED_MESSAGE).to_string(),
      WorkflowError::DecodeError(_) => RENDER_FAILED_MESSAGE.to_string(),
    }
  }
}

/// 多个提交同时进行时，如何处理先后到达的响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
  /// 最后到达的响应生效
  #[default]
  LastArrival,
  /// 只接受不早于已生效提交的响应，过期响应被丢弃
  LatestIssued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
  Applied,
  /// 响应已过期，未修改状态
  Superseded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
  pub selected_file: Option<LocalFile>,
  pub preview: Option<PreviewSource>,
  pub result: Option<UploadResult>,
  pub error_message: Option<String>,
}

#[derive(Default)]
struct Inner {
  state: WorkflowState,
  issued: u64,
  applied: u64,
}

/// 上传与标注流程，会话与检测服务由构造时注入
pub struct UploadWorkflow<S, A> {
  session: S,
  api: A,
  policy: AcceptPolicy,
  ordering: ResponseOrdering,
  inner: Mutex<Inner>,
}

impl<S: Session, A: DetectionApi> UploadWorkflow<S, A> {
  pub fn new(session: S, api: A) -> Self {
    Self {
      session,
      api,
      policy: AcceptPolicy::default(),
      ordering: ResponseOrdering::default(),
      inner: Mutex::new(Inner::default()),
    }
  }

  pub fn with_accept_policy(mut self, policy: AcceptPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_response_ordering(mut self, ordering: ResponseOrdering) -> Self {
    self.ordering = ordering;
    self
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn state(&self) -> WorkflowState {
    self.lock().state.clone()
  }

  pub fn selected_file(&self) -> Option<LocalFile> {
    self.lock().state.selected_file.clone()
  }

  pub fn preview(&self) -> Option<PreviewSource> {
    self.lock().state.preview.clone()
  }

  pub fn result(&self) -> Option<UploadResult> {
    self.lock().state.result.clone()
  }

  pub fn error_message(&self) -> Option<String> {
    self.lock().state.error_message.clone()
  }

  /// 选择文件；新的选择会替换之前的文件
  pub fn select_file(&self, candidate: LocalFile) -> Result<MediaKind, ValidationError> {
    let mut inner = self.lock();
    match self.policy.classify(candidate.mime()) {
      Some(kind) => {
        info!("已选择文件 {} ({}, {} 字节)", candidate.name(), candidate.mime(), candidate.len());
        inner.state.preview = Some(PreviewSource::from_file(&candidate));
        inner.state.selected_file = Some(candidate);
        inner.state.error_message = None;
        inner.state.result = None;
        Ok(kind)
      }
      None => {
        warn!("拒绝文件 {}: 不支持的类型 {}", candidate.name(), candidate.mime());
        let e = ValidationError::UnsupportedMedia {
          mime: candidate.mime().to_string(),
          policy: self.policy,
        };
        inner.state.error_message = Some(e.to_string());
        inner.state.selected_file = None;
        inner.state.preview = None;
        Err(e)
      }
    }
  }

  /// 提交当前文件进行检测。失败会同时写入 `error_message`
  pub async fn submit(&self) -> Result<SubmitOutcome, WorkflowError> {
    let (file, ticket) = {
      let mut inner = self.lock();
      let Some(file) = inner.state.selected_file.clone() else {
        warn!("未选择文件，取消提交");
        inner.state.error_message = Some(NO_FILE_MESSAGE.to_string());
        return Err(ValidationError::NoFileSelected.into());
      };
      inner.issued += 1;
      (file, inner.issued)
    };

    info!("提交 #{}: {}", ticket, file.name());
    let response = self.send(&file).await;
    self.apply(ticket, &file, response)
  }

  async fn send(&self, file: &LocalFile) -> Result<UploadResult, WorkflowError> {
    // 每次提交都重新获取令牌
    let token = self.session.id_token().await?;
    Ok(self.api.upload(&token, file).await?)
  }

  fn apply(
    &self,
    ticket: u64,
    file: &LocalFile,
    response: Result<UploadResult, WorkflowError>,
  ) -> Result<SubmitOutcome, WorkflowError> {
    let mut inner = self.lock();
    if self.ordering == ResponseOrdering::LatestIssued && ticket < inner.applied {
      warn!("丢弃过期的响应 #{} (已生效 #{})", ticket, inner.applied);
      return Ok(SubmitOutcome::Superseded);
    }
    inner.applied = inner.applied.max(ticket);

    match response {
      Ok(result) => {
        info!("提交 #{} 完成: {} 个检测结果", ticket, result.detections.len());
        // 检测框坐标属于返回图像的坐标系；没有返回图像时使用提交的原文件
        let preview = match result.result_image_base64.as_deref() {
          Some(encoded) if !encoded.is_empty() => PreviewSource::from_base64(encoded),
          _ => PreviewSource::from_file(file),
        };
        inner.state.preview = Some(preview);
        inner.state.result = Some(result);
        inner.state.error_message = None;
        Ok(SubmitOutcome::Applied)
      }
      Err(e) => {
        error!("提交 #{} 失败: {}", ticket, e);
        inner.state.error_message = Some(e.user_message());
        inner.state.result = None;
        Err(e)
      }
    }
  }

  /// 当结果与预览同时存在时绘制标注，返回是否进行了绘制。
  /// 解码失败不影响已有结果，也不修改画布
  pub async fn render<C: Canvas + ?Sized>(&self, canvas: &mut C) -> Result<bool, DecodeError> {
    let (preview, result) = {
      let inner = self.lock();
      match (&inner.state.preview, &inner.state.result) {
        (Some(preview), Some(result)) => (preview.clone(), result.clone()),
        _ => return Ok(false),
      }
    };
    if !preview.is_image() {
      debug!("预览不是图像 ({})，跳过标注", preview.mime());
      return Ok(false);
    }
    render_annotation(canvas, &preview, &result).await?;
    Ok(true)
  }
}
