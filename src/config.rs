// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/config.rs - 客户端配置
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

use std::{env, path::PathBuf, str::FromStr};

use thiserror::Error;
use url::Url;

use crate::{history::DEFAULT_PER_PAGE, workflow::ResponseOrdering};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/";

pub const ENV_API_URL: &str = "GUARDIAN_API_URL";
pub const ENV_PER_PAGE: &str = "GUARDIAN_PER_PAGE";
pub const ENV_FONT: &str = "GUARDIAN_FONT";
pub const ENV_LOG_FORMAT: &str = "GUARDIAN_LOG_FORMAT";
pub const ENV_RESPONSE_ORDERING: &str = "GUARDIAN_RESPONSE_ORDERING";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("{var} 不是合法的 URL: {source}")]
  InvalidUrl {
    var: &'static str,
    source: url::ParseError,
  },
  #[error("{var} 的取值 `{value}` 无效: {reason}")]
  InvalidValue {
    var: &'static str,
    value: String,
    reason: &'static str,
  },
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

impl LogFormat {
  pub fn as_str(&self) -> &'static str {
    match self {
      LogFormat::Pretty => "pretty",
      LogFormat::Json => "json",
    }
  }
}

impl FromStr for LogFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "pretty" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(format!(
        "{} is not a supported log format. Use either `pretty` or `json`.",
        other
      )),
    }
  }
}

fn parse_ordering(value: &str) -> Option<ResponseOrdering> {
  match value.to_lowercase().as_str() {
    "last-arrival" | "last_arrival" => Some(ResponseOrdering::LastArrival),
    "latest-issued" | "latest_issued" => Some(ResponseOrdering::LatestIssued),
    _ => None,
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  pub api_base: Url,
  pub per_page: u32,
  pub response_ordering: ResponseOrdering,
  pub font_path: Option<PathBuf>,
  pub log_format: LogFormat,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base: default_api_base(),
      per_page: DEFAULT_PER_PAGE,
      response_ordering: ResponseOrdering::default(),
      font_path: None,
      log_format: LogFormat::default(),
    }
  }
}

fn default_api_base() -> Url {
  Url::parse(DEFAULT_API_BASE).unwrap_or_else(|_| unreachable!("默认地址是合法的 URL"))
}

impl ClientConfig {
  /// 从进程环境变量读取配置，未设置的项使用默认值
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let mut config = Self::default();
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = lookup(ENV_API_URL) {
      config.api_base = Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
        var: ENV_API_URL,
        source,
      })?;
    }
    if let Some(value) = lookup(ENV_PER_PAGE) {
      config.per_page = match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
          return Err(ConfigError::InvalidValue {
            var: ENV_PER_PAGE,
            value,
            reason: "需要正整数",
          });
        }
      };
    }
    if let Some(value) = lookup(ENV_FONT) {
      config.font_path = Some(PathBuf::from(value));
    }
    if let Some(value) = lookup(ENV_LOG_FORMAT) {
      config.log_format = value.parse().map_err(|_| ConfigError::InvalidValue {
        var: ENV_LOG_FORMAT,
        value: value.clone(),
        reason: "可选 pretty 或 json",
      })?;
    }
    if let Some(value) = lookup(ENV_RESPONSE_ORDERING) {
      config.response_ordering = parse_ordering(&value).ok_or_else(|| ConfigError::InvalidValue {
        var: ENV_RESPONSE_ORDERING,
        value: value.clone(),
        reason: "可选 last-arrival 或 latest-issued",
      })?;
    }
    Ok(config)
  }
}
