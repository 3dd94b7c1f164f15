// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/model.rs - 检测服务数据模型
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

use std::{fmt, marker::PhantomData};

use serde::{
  Deserialize, Deserializer, Serialize, Serializer,
  de::{MapAccess, Visitor},
  ser::SerializeMap,
};

/// 单个检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub label: String,
  pub confidence: f64,
  pub bbox: [f64; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

impl Detection {
  pub fn x_min(&self) -> f64 {
    self.bbox[0]
  }

  pub fn y_min(&self) -> f64 {
    self.bbox[1]
  }

  pub fn width(&self) -> f64 {
    self.bbox[2] - self.bbox[0]
  }

  pub fn height(&self) -> f64 {
    self.bbox[3] - self.bbox[1]
  }

  /// 形如 `87.00%`
  pub fn confidence_percent(&self) -> String {
    format!("{:.2}%", self.confidence * 100.0)
  }

  /// 形如 `helmet (87.00%)`
  pub fn label_text(&self) -> String {
    format!("{} ({})", self.label, self.confidence_percent())
  }
}

/// 一次成功上传的返回结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadResult {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub upload_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filename: Option<String>,
  #[serde(default)]
  pub detections: Vec<Detection>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result_image_base64: Option<String>,
}

/// 历史记录中的一次上传
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
  pub upload_id: i64,
  pub filename: String,
  pub upload_time: String,
  #[serde(default)]
  pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
  #[serde(default)]
  pub uploads: Vec<UploadRecord>,
  #[serde(default = "default_total_pages")]
  pub total_pages: u32,
}

fn default_total_pages() -> u32 {
  1
}

/// 按服务端返回顺序保存的字符串键映射。重复的键保留首次出现的位置，取最后的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
  fn default() -> Self {
    Self(Vec::new())
  }
}

impl<V> OrderedMap<V> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, value: V) {
    let key = key.into();
    match self.0.iter_mut().find(|(k, _)| *k == key) {
      Some((_, slot)) => *slot = value,
      None => self.0.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&V> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|(k, _)| k.as_str())
  }

  pub fn values(&self) -> impl Iterator<Item = &V> {
    self.0.iter().map(|(_, v)| v)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = Self::new();
    for (key, value) in iter {
      map.insert(key, value);
    }
    map
  }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (key, value) in &self.0 {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
  type Value = OrderedMap<V>;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("a JSON object")
  }

  fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
    let mut map = OrderedMap::new();
    while let Some((key, value)) = access.next_entry::<String, V>()? {
      map.insert(key, value);
    }
    Ok(map)
  }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
  }
}

/// 统计分析结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsReport {
  #[serde(default)]
  pub total_uploads: u64,
  #[serde(default)]
  pub label_counts: OrderedMap<u64>,
  #[serde(default)]
  pub daily_trends: OrderedMap<OrderedMap<u64>>,
}

/// 服务端错误响应体 `{ "detail": ... }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
  #[serde(default)]
  pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
  /// 仅当 `detail` 为字符串时才作为可展示信息
  pub fn message(self) -> Option<String> {
    match self.detail {
      Some(serde_json::Value::String(message)) if !message.is_empty() => Some(message),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upload_result_parses_integer_boxes_and_null_image() {
    let body = r#"{
      "upload_id": 3,
      "filename": "site.jpg",
      "detections": [{"label": "helmet", "confidence": 0.87, "bbox": [10, 20, 110, 220]}],
      "result_image_base64": null
    }"#;
    let result: UploadResult = serde_json::from_str(body).unwrap();
    assert_eq!(result.upload_id, Some(3));
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].bbox, [10.0, 20.0, 110.0, 220.0]);
    assert!(result.result_image_base64.is_none());
  }

  #[test]
  fn detection_label_text() {
    let detection = Detection {
      label: "helmet".into(),
      confidence: 0.87,
      bbox: [10.0, 20.0, 110.0, 220.0],
    };
    assert_eq!(detection.label_text(), "helmet (87.00%)");
    assert_eq!(detection.width(), 100.0);
    assert_eq!(detection.height(), 200.0);
  }

  #[test]
  fn wire_numbers_keep_double_precision() {
    let detection: Detection = serde_json::from_str(
      r#"{"label": "vest", "confidence": 0.00015, "bbox": [16777217, 0, 16777219, 3]}"#,
    )
    .unwrap();
    assert_eq!(detection.confidence_percent(), "0.01%");
    assert_eq!(detection.x_min(), 16777217.0);
    assert_eq!(detection.width(), 2.0);
  }

  #[test]
  fn error_detail_only_uses_string_messages() {
    let detail: ErrorDetail = serde_json::from_str(r#"{"detail": "File too large"}"#).unwrap();
    assert_eq!(detail.message().as_deref(), Some("File too large"));

    let validation: ErrorDetail =
      serde_json::from_str(r#"{"detail": [{"loc": ["body", "file"], "msg": "field required"}]}"#)
        .unwrap();
    assert_eq!(validation.message(), None);

    let empty: ErrorDetail = serde_json::from_str("{}").unwrap();
    assert_eq!(empty.message(), None);
  }

  #[test]
  fn analytics_defaults_when_fields_missing() {
    let report: AnalyticsReport = serde_json::from_str(r#"{"total_uploads": 2}"#).unwrap();
    assert_eq!(report.total_uploads, 2);
    assert!(report.label_counts.is_empty());
    assert!(report.daily_trends.is_empty());
  }

  #[test]
  fn analytics_keeps_server_order() {
    let report: AnalyticsReport = serde_json::from_str(
      r#"{
        "total_uploads": 3,
        "label_counts": {"vest": 1, "helmet": 2, "vest": 4},
        "daily_trends": {"2025-01-02": {"vest": 1}, "2025-01-01": {"helmet": 2}}
      }"#,
    )
    .unwrap();
    assert_eq!(report.label_counts.keys().collect::<Vec<_>>(), vec!["vest", "helmet"]);
    assert_eq!(report.label_counts.get("vest"), Some(&4));
    assert_eq!(
      report.daily_trends.keys().collect::<Vec<_>>(),
      vec!["2025-01-02", "2025-01-01"]
    );

    let encoded = serde_json::to_string(&report.label_counts).unwrap();
    assert_eq!(encoded, r#"{"vest":4,"helmet":2}"#);
  }
}
