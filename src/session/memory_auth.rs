// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/session/memory_auth.rs - 进程内认证服务
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

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use tracing::{info, warn};

use crate::session::{AuthProvider, Session, SessionError, UserIdentity};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
  uid: String,
  password: String,
}

#[derive(Default)]
struct MemoryAuthState {
  accounts: HashMap<String, Account>,
  current: Option<UserIdentity>,
  next_uid: u32,
  token_counter: u64,
}

/// 进程内认证服务，令牌每次获取都不同
#[derive(Default)]
pub struct MemoryAuth {
  state: Mutex<MemoryAuthState>,
}

impl MemoryAuth {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_state<R>(&self, f: impl FnOnce(&mut MemoryAuthState) -> R) -> R {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
  }

  /// 已获取令牌的次数
  pub fn tokens_issued(&self) -> u64 {
    self.with_state(|state| state.token_counter)
  }
}

impl Session for MemoryAuth {
  fn current_user(&self) -> Option<UserIdentity> {
    self.with_state(|state| state.current.clone())
  }

  async fn id_token(&self) -> Result<String, SessionError> {
    self.with_state(|state| -> Result<String, SessionError> {
      let user = state.current.as_ref().ok_or(SessionError::NotSignedIn)?;
      state.token_counter += 1;
      Ok(format!("{}.{}", user.uid, state.token_counter))
    })
  }
}

impl AuthProvider for MemoryAuth {
  async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, SessionError> {
    let email = email.trim().to_ascii_lowercase();
    self.with_state(|state| {
      let uid = match state.accounts.get(&email) {
        Some(account) if account.password == password => account.uid.clone(),
        _ => {
          warn!("登录失败: {}", email);
          return Err(SessionError::Provider("Invalid email or password.".to_string()));
        }
      };
      let user = UserIdentity {
        uid,
        email: Some(email),
      };
      info!("用户已登录: {}", user.uid);
      state.current = Some(user.clone());
      Ok(user)
    })
  }

  async fn sign_up(&self, email: &str, password: &str) -> Result<UserIdentity, SessionError> {
    let email = email.trim().to_ascii_lowercase();
    if !email.contains('@') {
      return Err(SessionError::Provider("Invalid email address.".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
      return Err(SessionError::Provider(format!(
        "Password should be at least {} characters.",
        MIN_PASSWORD_LEN
      )));
    }

    self.with_state(|state| {
      if state.accounts.contains_key(&email) {
        return Err(SessionError::Provider("Email already in use.".to_string()));
      }
      state.next_uid += 1;
      let uid = format!("uid-{:04}", state.next_uid);
      state.accounts.insert(
        email.clone(),
        Account {
          uid: uid.clone(),
          password: password.to_string(),
        },
      );
      let user = UserIdentity {
        uid,
        email: Some(email),
      };
      info!("新用户注册: {}", user.uid);
      // 注册成功即登录
      state.current = Some(user.clone());
      Ok(user)
    })
  }

  async fn sign_out(&self) -> Result<(), SessionError> {
    self.with_state(|state| {
      if let Some(user) = state.current.take() {
        info!("用户已退出: {}", user.uid);
      }
    });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn sign_up_signs_in_and_tokens_are_fresh() {
    let auth = MemoryAuth::new();
    assert!(matches!(auth.id_token().await, Err(SessionError::NotSignedIn)));

    let user = auth.sign_up("Worker@Site.com", "secret1").await.unwrap();
    assert_eq!(user.email.as_deref(), Some("worker@site.com"));
    assert_eq!(auth.current_user(), Some(user));

    let first = auth.id_token().await.unwrap();
    let second = auth.id_token().await.unwrap();
    assert_ne!(first, second);
    assert_eq!(auth.tokens_issued(), 2);
  }

  #[tokio::test]
  async fn provider_messages_are_verbatim() {
    let auth = MemoryAuth::new();
    let err = auth.sign_up("worker@site.com", "123").await.unwrap_err();
    assert_eq!(err.to_string(), "Password should be at least 6 characters.");

    auth.sign_up("worker@site.com", "secret1").await.unwrap();
    let err = auth.sign_up("worker@site.com", "secret2").await.unwrap_err();
    assert_eq!(err.to_string(), "Email already in use.");

    auth.sign_out().await.unwrap();
    assert!(auth.current_user().is_none());

    let err = auth.sign_in("worker@site.com", "wrong-pass").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password.");
    assert!(auth.sign_in("worker@site.com", "secret1").await.is_ok());
  }
}
