// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/api/http.rs - HTTP 检测服务客户端
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

use reqwest::{
  Client, Response,
  multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl,
  analytics::AnalyticsQuery,
  api::{ANALYTICS_ENDPOINT, ApiError, DetectionApi, HISTORY_ENDPOINT, UPLOAD_ENDPOINT, UPLOAD_FIELD},
  history::HistoryQuery,
  media::LocalFile,
  model::{AnalyticsReport, ErrorDetail, HistoryPage, UploadResult},
};

const HTTP_SCHEMES: [&str; 2] = ["http", "https"];

/// 基于 reqwest 的检测服务客户端
#[derive(Debug, Clone)]
pub struct HttpApi {
  client: Client,
  base: Url,
}

impl FromUrl for HttpApi {
  type Error = ApiError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !HTTP_SCHEMES.contains(&url.scheme()) {
      error!("URI scheme mismatch: expected http/https, found '{}'", url.scheme());
      return Err(ApiError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::with_client(Client::new(), url.clone()))
  }
}

impl HttpApi {
  pub fn with_client(client: Client, mut base: Url) -> Self {
    // 保证 join 时接在路径末尾
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }
    Self { client, base }
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, name: &str) -> Result<Url, ApiError> {
    Ok(self.base.join(name)?)
  }

  async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
      let detail = serde_json::from_slice::<ErrorDetail>(&body)
        .ok()
        .and_then(ErrorDetail::message);
      error!("服务端返回 {}: {:?}", status, detail);
      return Err(ApiError::Remote {
        status: status.as_u16(),
        detail,
      });
    }
    Ok(serde_json::from_slice(&body)?)
  }
}

impl DetectionApi for HttpApi {
  async fn upload(&self, token: &str, file: &LocalFile) -> Result<UploadResult, ApiError> {
    let url = self.endpoint(UPLOAD_ENDPOINT)?;
    let part = Part::bytes(file.bytes().to_vec())
      .file_name(file.name().to_string())
      .mime_str(file.mime())?;
    let form = Form::new().part(UPLOAD_FIELD, part);

    info!("上传文件 {} ({} 字节) 到 {}", file.name(), file.len(), url);
    let response = self
      .client
      .post(url)
      .bearer_auth(token)
      .multipart(form)
      .send()
      .await?;
    let result: UploadResult = Self::read_json(response).await?;
    debug!("收到 {} 个检测结果", result.detections.len());
    Ok(result)
  }

  async fn history(&self, token: &str, query: &HistoryQuery) -> Result<HistoryPage, ApiError> {
    let url = self.endpoint(HISTORY_ENDPOINT)?;
    debug!("查询历史记录: {:?}", query);
    let response = self
      .client
      .get(url)
      .bearer_auth(token)
      .query(&query.to_params())
      .send()
      .await?;
    Self::read_json(response).await
  }

  async fn analytics(&self, token: &str, query: &AnalyticsQuery) -> Result<AnalyticsReport, ApiError> {
    let url = self.endpoint(ANALYTICS_ENDPOINT)?;
    debug!("查询统计数据: {:?}", query);
    let response = self
      .client
      .get(url)
      .bearer_auth(token)
      .query(&query.to_params())
      .send()
      .await?;
    Self::read_json(response).await
  }
}
