// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/session.rs - 会话与身份认证
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

mod memory_auth;
pub use self::memory_auth::MemoryAuth;

mod token_session;
pub use self::token_session::{CommandTokenSession, StaticTokenSession};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("当前没有已登录用户")]
  NotSignedIn,
  /// 认证服务给出的错误信息，原样展示给用户
  #[error("{0}")]
  Provider(String),
  #[error("令牌命令执行失败: {0}")]
  CommandError(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
  pub uid: String,
  pub email: Option<String>,
}

/// 会话访问器：提供当前用户身份，并在每次请求时获取新的令牌
pub trait Session {
  fn current_user(&self) -> Option<UserIdentity>;

  /// 身份状态仍在加载中
  fn is_loading(&self) -> bool {
    false
  }

  fn id_token(&self) -> impl Future<Output = Result<String, SessionError>> + Send;
}

/// 账号操作，失败信息原样返回
pub trait AuthProvider: Session {
  fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<UserIdentity, SessionError>> + Send;

  fn sign_up(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<UserIdentity, SessionError>> + Send;

  fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

impl<T: Session + Send + Sync> Session for Arc<T> {
  fn current_user(&self) -> Option<UserIdentity> {
    (**self).current_user()
  }

  fn is_loading(&self) -> bool {
    (**self).is_loading()
  }

  fn id_token(&self) -> impl Future<Output = Result<String, SessionError>> + Send {
    (**self).id_token()
  }
}

impl<T: AuthProvider + Send + Sync> AuthProvider for Arc<T> {
  fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<UserIdentity, SessionError>> + Send {
    (**self).sign_in(email, password)
  }

  fn sign_up(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<UserIdentity, SessionError>> + Send {
    (**self).sign_up(email, password)
  }

  fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send {
    (**self).sign_out()
  }
}
