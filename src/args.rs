// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/args.rs - 命令行公共参数
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

use clap::Args;
use thiserror::Error;
use url::Url;

use crate::{
  config::{ClientConfig, ConfigError, LogFormat},
  session::{CommandTokenSession, Session, SessionError, StaticTokenSession, UserIdentity},
};

#[derive(Error, Debug)]
pub enum ArgsError {
  #[error("需要 --token 或 --token-command 之一")]
  MissingCredentials,
  #[error("令牌命令为空")]
  EmptyTokenCommand,
  #[error(transparent)]
  ConfigError(#[from] ConfigError),
}

/// 连接检测服务所需的参数，各命令行工具共用
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
  /// 检测服务地址，覆盖 GUARDIAN_API_URL
  #[arg(long, value_name = "URL")]
  pub api_url: Option<Url>,

  /// 固定的身份令牌
  #[arg(long, value_name = "TOKEN", conflicts_with = "token_command")]
  pub token: Option<String>,

  /// 每次请求前执行以获取令牌的命令，如 `gcloud auth print-identity-token`
  #[arg(long, value_name = "COMMAND")]
  pub token_command: Option<String>,

  /// 用户标识，仅用于日志
  #[arg(long, default_value = "cli", value_name = "UID")]
  pub user: String,

  /// 日志格式（pretty 或 json），覆盖 GUARDIAN_LOG_FORMAT
  #[arg(long, value_name = "FORMAT")]
  pub log_format: Option<LogFormat>,
}

impl ConnectArgs {
  /// 环境变量配置叠加命令行参数
  pub fn config(&self) -> Result<ClientConfig, ArgsError> {
    Ok(self.apply_to(ClientConfig::from_env()?))
  }

  /// 用命令行参数覆盖已有配置
  pub fn apply_to(&self, mut config: ClientConfig) -> ClientConfig {
    if let Some(api_url) = &self.api_url {
      config.api_base = api_url.clone();
    }
    if let Some(format) = self.log_format {
      config.log_format = format;
    }
    config
  }

  pub fn session(&self) -> Result<CliSession, ArgsError> {
    match (&self.token, &self.token_command) {
      (Some(token), _) => Ok(CliSession::Static(StaticTokenSession::new(&self.user, token))),
      (None, Some(command)) => CommandTokenSession::from_command_line(&self.user, command)
        .map(CliSession::Command)
        .ok_or(ArgsError::EmptyTokenCommand),
      (None, None) => Err(ArgsError::MissingCredentials),
    }
  }
}

/// 命令行工具使用的会话
#[derive(Debug, Clone)]
pub enum CliSession {
  Static(StaticTokenSession),
  Command(CommandTokenSession),
}

impl Session for CliSession {
  fn current_user(&self) -> Option<UserIdentity> {
    match self {
      CliSession::Static(session) => session.current_user(),
      CliSession::Command(session) => session.current_user(),
    }
  }

  async fn id_token(&self) -> Result<String, SessionError> {
    match self {
      CliSession::Static(session) => session.id_token().await,
      CliSession::Command(session) => session.id_token().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ENV_API_URL, ENV_LOG_FORMAT, ENV_PER_PAGE};
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestCli {
    #[command(flatten)]
    connect: ConnectArgs,
  }

  fn env_config() -> ClientConfig {
    ClientConfig::from_lookup(|key| match key {
      ENV_API_URL => Some("https://env.example.com/".into()),
      ENV_LOG_FORMAT => Some("pretty".into()),
      ENV_PER_PAGE => Some("25".into()),
      _ => None,
    })
    .unwrap()
  }

  #[test]
  fn flags_override_config() {
    let cli = TestCli::parse_from([
      "test",
      "--api-url",
      "https://ppe.example.com/",
      "--token",
      "abc",
      "--log-format",
      "json",
    ]);
    let config = cli.connect.apply_to(env_config());
    assert_eq!(config.api_base.as_str(), "https://ppe.example.com/");
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.per_page, 25);
  }

  #[test]
  fn absent_flags_keep_config() {
    let cli = TestCli::parse_from(["test", "--token", "abc"]);
    let config = cli.connect.apply_to(env_config());
    assert_eq!(config, env_config());
    assert_eq!(config.api_base.as_str(), "https://env.example.com/");
    assert_eq!(config.log_format, LogFormat::Pretty);
  }

  #[tokio::test]
  async fn static_token_session() {
    let cli = TestCli::parse_from(["test", "--token", "abc", "--user", "inspector"]);
    let session = cli.connect.session().unwrap();
    assert_eq!(session.id_token().await.unwrap(), "abc");
    assert_eq!(session.current_user().unwrap().uid, "inspector");
  }

  #[test]
  fn credentials_are_required() {
    let cli = TestCli::parse_from(["test"]);
    assert!(matches!(cli.connect.session(), Err(ArgsError::MissingCredentials)));
    assert!(TestCli::try_parse_from(["test", "--token", "a", "--token-command", "b"]).is_err());
  }
}
