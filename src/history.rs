// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/history.rs - 上传历史浏览
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

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  api::{DetectionApi, FetchError},
  model::{Detection, UploadRecord},
  session::Session,
};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const HISTORY_FAILED_MESSAGE: &str = "Failed to fetch history.";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
  #[error("Invalid date '{0}', expected YYYY-MM-DD.")]
  InvalidDate(String),
}

/// 解析 `YYYY-MM-DD`，空字符串视为未设置
pub fn parse_date_filter(value: &str) -> Result<Option<NaiveDate>, FilterError> {
  let value = value.trim();
  if value.is_empty() {
    return Ok(None);
  }
  NaiveDate::parse_from_str(value, DATE_FORMAT)
    .map(Some)
    .map_err(|_| FilterError::InvalidDate(value.to_string()))
}

pub(crate) fn push_date_params(
  params: &mut Vec<(&'static str, String)>,
  start_date: Option<NaiveDate>,
  end_date: Option<NaiveDate>,
) {
  if let Some(date) = start_date {
    params.push(("start_date", date.format(DATE_FORMAT).to_string()));
  }
  if let Some(date) = end_date {
    params.push(("end_date", date.format(DATE_FORMAT).to_string()));
  }
}

/// 历史记录筛选条件
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryFilters {
  pub filename: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
}

impl HistoryFilters {
  /// 从表单输入构造，空输入表示不筛选
  pub fn parse(filename: &str, start_date: &str, end_date: &str) -> Result<Self, FilterError> {
    let filename = filename.trim();
    Ok(Self {
      filename: (!filename.is_empty()).then(|| filename.to_string()),
      start_date: parse_date_filter(start_date)?,
      end_date: parse_date_filter(end_date)?,
    })
  }
}

/// `GET /history` 的查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
  pub page: u32,
  pub per_page: u32,
  pub filters: HistoryFilters,
}

impl Default for HistoryQuery {
  fn default() -> Self {
    Self {
      page: 1,
      per_page: DEFAULT_PER_PAGE,
      filters: HistoryFilters::default(),
    }
  }
}

impl HistoryQuery {
  pub fn with_per_page(mut self, per_page: u32) -> Self {
    self.per_page = per_page.max(1);
    self
  }

  pub fn to_params(&self) -> Vec<(&'static str, String)> {
    let mut params = vec![
      ("page", self.page.to_string()),
      ("per_page", self.per_page.to_string()),
    ];
    if let Some(filename) = &self.filters.filename {
      params.push(("filename", filename.clone()));
    }
    push_date_params(&mut params, self.filters.start_date, self.filters.end_date);
    params
  }
}

/// 单条检测结果的展示行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRow {
  pub label: String,
  pub confidence: String,
  pub bbox: String,
}

impl From<&Detection> for DetectionRow {
  fn from(detection: &Detection) -> Self {
    Self {
      label: detection.label.clone(),
      confidence: detection.confidence_percent(),
      bbox: format!(
        "[x: {}, y: {}, w: {}, h: {}]",
        detection.x_min(),
        detection.y_min(),
        detection.width(),
        detection.height()
      ),
    }
  }
}

/// 单次上传的展示行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
  pub upload_id: i64,
  pub filename: String,
  pub upload_time: String,
  pub summary: String,
  pub expanded: bool,
  pub details: Vec<DetectionRow>,
}

/// 将 ISO-8601 时间格式化为 `YYYY-MM-DD HH:MM:SS`，无法解析时原样返回
pub fn format_upload_time(raw: &str) -> String {
  if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
    return time.naive_local().format(TIME_FORMAT).to_string();
  }
  match raw.parse::<NaiveDateTime>() {
    Ok(time) => time.format(TIME_FORMAT).to_string(),
    Err(_) => raw.to_string(),
  }
}

/// 历史记录浏览状态
pub struct HistoryView<S, A> {
  session: S,
  api: A,
  query: HistoryQuery,
  uploads: Vec<UploadRecord>,
  total_pages: u32,
  error_message: Option<String>,
  expanded: HashSet<i64>,
}

impl<S: Session, A: DetectionApi> HistoryView<S, A> {
  pub fn new(session: S, api: A) -> Self {
    Self {
      session,
      api,
      query: HistoryQuery::default(),
      uploads: Vec::new(),
      total_pages: 1,
      error_message: None,
      expanded: HashSet::new(),
    }
  }

  pub fn with_per_page(mut self, per_page: u32) -> Self {
    self.query = self.query.with_per_page(per_page);
    self
  }

  pub fn query(&self) -> &HistoryQuery {
    &self.query
  }

  pub fn page(&self) -> u32 {
    self.query.page
  }

  pub fn total_pages(&self) -> u32 {
    self.total_pages
  }

  pub fn uploads(&self) -> &[UploadRecord] {
    &self.uploads
  }

  pub fn error_message(&self) -> Option<&str> {
    self.error_message.as_deref()
  }

  /// 重新获取当前页，失败时保留之前的数据
  pub async fn refresh(&mut self) -> Result<(), FetchError> {
    match self.fetch().await {
      Ok(()) => {
        self.error_message = None;
        Ok(())
      }
      Err(FetchError::NotSignedIn) => Err(FetchError::NotSignedIn),
      Err(e) => {
        warn!("获取历史记录失败: {}", e);
        self.error_message = Some(e.user_message(HISTORY_FAILED_MESSAGE));
        Err(e)
      }
    }
  }

  async fn fetch(&mut self) -> Result<(), FetchError> {
    if self.session.current_user().is_none() {
      return Err(FetchError::NotSignedIn);
    }
    let token = self.session.id_token().await?;
    let page = self.api.history(&token, &self.query).await?;
    info!(
      "历史记录第 {}/{} 页: {} 条",
      self.query.page,
      page.total_pages,
      page.uploads.len()
    );
    self.uploads = page.uploads;
    self.total_pages = page.total_pages.max(1);
    Ok(())
  }

  /// 跳转到指定页（限制在 `1..=total_pages`）并刷新
  pub async fn go_to_page(&mut self, page: u32) -> Result<(), FetchError> {
    self.query.page = page.clamp(1, self.total_pages.max(1));
    self.refresh().await
  }

  /// 应用筛选条件，回到第一页并刷新
  pub async fn apply_filters(&mut self, filters: HistoryFilters) -> Result<(), FetchError> {
    self.query.filters = filters;
    self.query.page = 1;
    self.refresh().await
  }

  /// 展开或收起某条上传的检测明细，返回新的展开状态
  pub fn toggle_row(&mut self, upload_id: i64) -> bool {
    if self.expanded.remove(&upload_id) {
      false
    } else {
      self.expanded.insert(upload_id);
      true
    }
  }

  pub fn is_expanded(&self, upload_id: i64) -> bool {
    self.expanded.contains(&upload_id)
  }

  pub fn rows(&self) -> Vec<HistoryRow> {
    self
      .uploads
      .iter()
      .map(|upload| HistoryRow {
        upload_id: upload.upload_id,
        filename: upload.filename.clone(),
        upload_time: format_upload_time(&upload.upload_time),
        summary: format!("{} detections", upload.detections.len()),
        expanded: self.is_expanded(upload.upload_id),
        details: upload.detections.iter().map(DetectionRow::from).collect(),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    analytics::AnalyticsQuery,
    api::ApiError,
    media::LocalFile,
    model::{AnalyticsReport, HistoryPage, UploadResult},
    session::{MemoryAuth, StaticTokenSession},
  };
  use std::sync::Mutex;

  #[derive(Default)]
  struct PagedApi {
    queries: Mutex<Vec<HistoryQuery>>,
    fail_with: Mutex<Option<ApiError>>,
  }

  impl DetectionApi for PagedApi {
    async fn upload(&self, _: &str, _: &LocalFile) -> Result<UploadResult, ApiError> {
      unreachable!()
    }

    async fn history(&self, _: &str, query: &HistoryQuery) -> Result<HistoryPage, ApiError> {
      self.queries.lock().unwrap().push(query.clone());
      if let Some(e) = self.fail_with.lock().unwrap().take() {
        return Err(e);
      }
      Ok(HistoryPage {
        uploads: vec![UploadRecord {
          upload_id: query.page as i64,
          filename: format!("page-{}.jpg", query.page),
          upload_time: "2025-03-04T05:06:07.123456".into(),
          detections: vec![Detection {
            label: "vest".into(),
            confidence: 0.5,
            bbox: [10.0, 20.0, 40.0, 60.0],
          }],
        }],
        total_pages: 3,
      })
    }

    async fn analytics(&self, _: &str, _: &AnalyticsQuery) -> Result<AnalyticsReport, ApiError> {
      unreachable!()
    }
  }

  #[test]
  fn query_params_skip_empty_filters() {
    let query = HistoryQuery::default();
    assert_eq!(
      query.to_params(),
      vec![("page", "1".to_string()), ("per_page", "10".to_string())]
    );

    let filters = HistoryFilters::parse(" site ", "2025-01-01", "").unwrap();
    let query = HistoryQuery {
      page: 2,
      filters,
      ..HistoryQuery::default()
    };
    assert_eq!(
      query.to_params(),
      vec![
        ("page", "2".to_string()),
        ("per_page", "10".to_string()),
        ("filename", "site".to_string()),
        ("start_date", "2025-01-01".to_string()),
      ]
    );
  }

  #[test]
  fn invalid_dates_are_rejected_locally() {
    assert_eq!(
      HistoryFilters::parse("", "2025-13-01", ""),
      Err(FilterError::InvalidDate("2025-13-01".into()))
    );
    assert_eq!(parse_date_filter("  "), Ok(None));
  }

  #[test]
  fn upload_time_formatting() {
    assert_eq!(format_upload_time("2025-03-04T05:06:07.123456"), "2025-03-04 05:06:07");
    assert_eq!(format_upload_time("2025-03-04T05:06:07+08:00"), "2025-03-04 05:06:07");
    assert_eq!(format_upload_time("yesterday"), "yesterday");
  }

  #[tokio::test]
  async fn paging_is_clamped_and_rows_are_formatted() {
    let mut view = HistoryView::new(StaticTokenSession::new("u", "t"), PagedApi::default());
    view.refresh().await.unwrap();
    assert_eq!(view.total_pages(), 3);

    view.go_to_page(9).await.unwrap();
    assert_eq!(view.page(), 3);
    view.go_to_page(0).await.unwrap();
    assert_eq!(view.page(), 1);

    assert!(view.toggle_row(1));
    let rows = view.rows();
    assert_eq!(rows[0].summary, "1 detections");
    assert_eq!(rows[0].upload_time, "2025-03-04 05:06:07");
    assert!(rows[0].expanded);
    assert_eq!(rows[0].details[0].confidence, "50.00%");
    assert_eq!(rows[0].details[0].bbox, "[x: 10, y: 20, w: 30, h: 40]");
    assert!(!view.toggle_row(1));
  }

  #[tokio::test]
  async fn filters_reset_page_and_failures_keep_rows() {
    let api = PagedApi::default();
    let mut view = HistoryView::new(StaticTokenSession::new("u", "t"), api);
    view.refresh().await.unwrap();
    view.go_to_page(2).await.unwrap();

    view
      .apply_filters(HistoryFilters::parse("a.jpg", "", "").unwrap())
      .await
      .unwrap();
    assert_eq!(view.page(), 1);
    assert_eq!(view.query().filters.filename.as_deref(), Some("a.jpg"));

    *view.api.fail_with.lock().unwrap() = Some(ApiError::Remote {
      status: 500,
      detail: None,
    });
    assert!(view.refresh().await.is_err());
    assert_eq!(view.error_message(), Some(HISTORY_FAILED_MESSAGE));
    assert_eq!(view.uploads().len(), 1);

    view.refresh().await.unwrap();
    assert_eq!(view.error_message(), None);
  }

  #[tokio::test]
  async fn signed_out_session_skips_fetch() {
    let mut view = HistoryView::new(MemoryAuth::new(), PagedApi::default());
    assert!(matches!(view.refresh().await, Err(FetchError::NotSignedIn)));
    assert!(view.api.queries.lock().unwrap().is_empty());
    assert_eq!(view.error_message(), None);
  }
}
