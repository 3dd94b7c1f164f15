// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/session/token_session.rs - 命令行使用的令牌会话
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

use tokio::process::Command;
use tracing::{debug, error};

use crate::session::{Session, SessionError, UserIdentity};

/// 固定令牌会话
#[derive(Debug, Clone)]
pub struct StaticTokenSession {
  user: UserIdentity,
  token: String,
}

impl StaticTokenSession {
  pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      user: UserIdentity {
        uid: uid.into(),
        email: None,
      },
      token: token.into(),
    }
  }
}

impl Session for StaticTokenSession {
  fn current_user(&self) -> Option<UserIdentity> {
    Some(self.user.clone())
  }

  async fn id_token(&self) -> Result<String, SessionError> {
    if self.token.is_empty() {
      return Err(SessionError::NotSignedIn);
    }
    Ok(self.token.clone())
  }
}

/// 每次获取令牌时执行外部命令，取其标准输出作为令牌
#[derive(Debug, Clone)]
pub struct CommandTokenSession {
  user: UserIdentity,
  program: String,
  args: Vec<String>,
}

impl CommandTokenSession {
  pub fn new(uid: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      user: UserIdentity {
        uid: uid.into(),
        email: None,
      },
      program: program.into(),
      args,
    }
  }

  /// 按空白拆分命令行，如 `gcloud auth print-identity-token`
  pub fn from_command_line(uid: impl Into<String>, command_line: &str) -> Option<Self> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(Self::new(uid, program, parts.collect()))
  }
}

impl Session for CommandTokenSession {
  fn current_user(&self) -> Option<UserIdentity> {
    Some(self.user.clone())
  }

  async fn id_token(&self) -> Result<String, SessionError> {
    debug!("执行令牌命令: {}", self.program);
    let output = Command::new(&self.program).args(&self.args).output().await?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      error!("令牌命令退出状态 {}: {}", output.status, stderr);
      return Err(SessionError::Provider(stderr));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
      return Err(SessionError::NotSignedIn);
    }
    Ok(token)
  }
}
