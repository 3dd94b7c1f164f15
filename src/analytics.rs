// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/analytics.rs - 合规统计图表数据
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

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
  api::{DetectionApi, FetchError},
  history::push_date_params,
  model::AnalyticsReport,
  session::Session,
};

pub const ANALYTICS_FAILED_MESSAGE: &str = "Failed to fetch analytics.";
pub const BAR_SERIES_TITLE: &str = "Detection Counts";

// 折线颜色：hsl((index * 60) % 360, 70%, 50%)
const SERIES_HUE_STEP: u32 = 60;
const SERIES_SATURATION: f32 = 0.7;
const SERIES_LIGHTNESS: f32 = 0.5;

/// `GET /analytics` 的查询参数
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalyticsQuery {
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
}

impl AnalyticsQuery {
  pub fn to_params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    push_date_params(&mut params, self.start_date, self.end_date);
    params
  }
}

/// 各标签检测数量柱状图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarSeries {
  pub title: &'static str,
  pub labels: Vec<String>,
  pub values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSeries {
  pub label: String,
  pub values: Vec<u64>,
  pub color: [u8; 3],
}

/// 每日检测趋势折线图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendChart {
  pub dates: Vec<String>,
  pub series: Vec<LineSeries>,
}

/// HSL 转 RGB，h 取值 [0, 360)，s 与 l 取值 [0, 1]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
  let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = l - c / 2.0;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  [
    ((r + m) * 255.0).round() as u8,
    ((g + m) * 255.0).round() as u8,
    ((b + m) * 255.0).round() as u8,
  ]
}

pub fn series_color(index: usize) -> [u8; 3] {
  let hue = ((index as u32).wrapping_mul(SERIES_HUE_STEP) % 360) as f32;
  hsl_to_rgb(hue, SERIES_SATURATION, SERIES_LIGHTNESS)
}

pub fn bar_series(report: &AnalyticsReport) -> BarSeries {
  BarSeries {
    title: BAR_SERIES_TITLE,
    labels: report.label_counts.keys().map(str::to_string).collect(),
    values: report.label_counts.values().copied().collect(),
  }
}

/// 每个标签一条折线，缺失的日期记为 0。标签与日期均保持服务端返回的顺序
pub fn trend_chart(report: &AnalyticsReport) -> TrendChart {
  let dates: Vec<String> = report.daily_trends.keys().map(str::to_string).collect();
  let series = report
    .label_counts
    .keys()
    .enumerate()
    .map(|(index, label)| LineSeries {
      label: label.to_string(),
      values: report
        .daily_trends
        .values()
        .map(|counts| counts.get(label).copied().unwrap_or(0))
        .collect(),
      color: series_color(index),
    })
    .collect();
  TrendChart { dates, series }
}

/// 统计页面状态
pub struct AnalyticsView<S, A> {
  session: S,
  api: A,
  query: AnalyticsQuery,
  report: AnalyticsReport,
  error_message: Option<String>,
}

impl<S: Session, A: DetectionApi> AnalyticsView<S, A> {
  pub fn new(session: S, api: A) -> Self {
    Self {
      session,
      api,
      query: AnalyticsQuery::default(),
      report: AnalyticsReport::default(),
      error_message: None,
    }
  }

  pub fn report(&self) -> &AnalyticsReport {
    &self.report
  }

  pub fn query(&self) -> &AnalyticsQuery {
    &self.query
  }

  pub fn error_message(&self) -> Option<&str> {
    self.error_message.as_deref()
  }

  pub fn bar_series(&self) -> BarSeries {
    bar_series(&self.report)
  }

  pub fn trend_chart(&self) -> TrendChart {
    trend_chart(&self.report)
  }

  /// 重新获取统计数据，失败时保留之前的结果
  pub async fn refresh(&mut self) -> Result<(), FetchError> {
    if self.session.current_user().is_none() {
      return Err(FetchError::NotSignedIn);
    }
    let fetched = match self.session.id_token().await {
      Ok(token) => self
        .api
        .analytics(&token, &self.query)
        .await
        .map_err(FetchError::from),
      Err(e) => Err(FetchError::from(e)),
    };
    match fetched {
      Ok(report) => {
        info!(
          "统计数据: 共 {} 次上传, {} 个标签",
          report.total_uploads,
          report.label_counts.len()
        );
        self.report = report;
        self.error_message = None;
        Ok(())
      }
      Err(e) => {
        warn!("获取统计数据失败: {}", e);
        self.error_message = Some(e.user_message(ANALYTICS_FAILED_MESSAGE));
        Err(e)
      }
    }
  }

  pub async fn apply_filters(
    &mut self,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
  ) -> Result<(), FetchError> {
    self.query = AnalyticsQuery { start_date, end_date };
    self.refresh().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    api::ApiError,
    history::HistoryQuery,
    media::LocalFile,
    model::{HistoryPage, UploadResult},
    session::StaticTokenSession,
  };
  use crate::model::OrderedMap;
  use std::sync::Mutex;

  fn sample_report() -> AnalyticsReport {
    let label_counts = OrderedMap::from_iter([("helmet", 5), ("vest", 2)]);

    let day1 = OrderedMap::from_iter([("helmet", 3)]);
    let day2 = OrderedMap::from_iter([("helmet", 2), ("vest", 2)]);
    let daily_trends = OrderedMap::from_iter([("2025-01-02", day2), ("2025-01-01", day1)]);

    AnalyticsReport {
      total_uploads: 4,
      label_counts,
      daily_trends,
    }
  }

  struct ReportApi {
    responses: Mutex<Vec<Result<AnalyticsReport, ApiError>>>,
  }

  impl DetectionApi for ReportApi {
    async fn upload(&self, _: &str, _: &LocalFile) -> Result<UploadResult, ApiError> {
      unreachable!()
    }

    async fn history(&self, _: &str, _: &HistoryQuery) -> Result<HistoryPage, ApiError> {
      unreachable!()
    }

    async fn analytics(&self, _: &str, _: &AnalyticsQuery) -> Result<AnalyticsReport, ApiError> {
      self.responses.lock().unwrap().remove(0)
    }
  }

  #[test]
  fn series_colors_follow_hue_steps() {
    assert_eq!(series_color(0), [217, 38, 38]);
    assert_eq!(series_color(2), [38, 217, 38]);
    assert_eq!(series_color(6), series_color(0));
  }

  #[test]
  fn bar_and_trend_series() {
    let report = sample_report();
    let bars = bar_series(&report);
    assert_eq!(bars.labels, vec!["helmet", "vest"]);
    assert_eq!(bars.values, vec![5, 2]);

    let chart = trend_chart(&report);
    assert_eq!(chart.dates, vec!["2025-01-02", "2025-01-01"]);
    assert_eq!(chart.series[0].label, "helmet");
    assert_eq!(chart.series[0].values, vec![2, 3]);
    assert_eq!(chart.series[1].values, vec![2, 0]);
  }

  #[test]
  fn series_follow_server_label_order() {
    let report: AnalyticsReport = serde_json::from_str(
      r#"{
        "total_uploads": 3,
        "label_counts": {"vest": 1, "helmet": 2},
        "daily_trends": {"2025-01-01": {"helmet": 2, "vest": 1}}
      }"#,
    )
    .unwrap();

    let bars = bar_series(&report);
    assert_eq!(bars.labels, vec!["vest", "helmet"]);
    assert_eq!(bars.values, vec![1, 2]);

    let chart = trend_chart(&report);
    assert_eq!(chart.series[0].label, "vest");
    assert_eq!(chart.series[0].color, [217, 38, 38]);
    assert_eq!(chart.series[1].label, "helmet");
    assert_eq!(chart.series[1].color, series_color(1));
    assert_eq!(chart.series[1].values, vec![2]);
  }

  #[test]
  fn date_params() {
    let query = AnalyticsQuery {
      start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
      end_date: None,
    };
    assert_eq!(query.to_params(), vec![("start_date", "2025-01-01".to_string())]);
    assert!(AnalyticsQuery::default().to_params().is_empty());
  }

  #[tokio::test]
  async fn failures_keep_previous_report() {
    let api = ReportApi {
      responses: Mutex::new(vec![
        Ok(sample_report()),
        Err(ApiError::Remote {
          status: 403,
          detail: Some("Invalid or expired token".into()),
        }),
      ]),
    };
    let mut view = AnalyticsView::new(StaticTokenSession::new("u", "t"), api);
    assert_eq!(view.report().total_uploads, 0);

    view.refresh().await.unwrap();
    assert_eq!(view.report().total_uploads, 4);

    assert!(view.apply_filters(None, NaiveDate::from_ymd_opt(2025, 1, 2)).await.is_err());
    assert_eq!(view.error_message(), Some("Invalid or expired token"));
    assert_eq!(view.report().total_uploads, 4);
    assert_eq!(view.bar_series().values, vec![5, 2]);
  }
}
