// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/profile.rs - 用户资料与显示名称
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
  future::Future,
  path::PathBuf,
  sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  session::{Session, UserIdentity},
};

pub const USERS_COLLECTION: &str = "users";
pub const UNKNOWN_USER: &str = "Unknown User";
pub const GUEST: &str = "Guest";

#[derive(Error, Debug)]
pub enum ProfileError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("资料文档格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
  #[error("资料存储不可用: {0}")]
  Unavailable(String),
}

/// `users/<uid>` 文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(default)]
  pub username: Option<String>,
}

/// 文档存储，按集合与文档 ID 查询
pub trait ProfileStore {
  fn get_profile(
    &self,
    collection: &str,
    id: &str,
  ) -> impl Future<Output = Result<Option<UserProfile>, ProfileError>> + Send;
}

/// 进程内文档存储
#[derive(Default)]
pub struct MemoryProfileStore {
  documents: Mutex<HashMap<(String, String), UserProfile>>,
}

impl MemoryProfileStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, collection: &str, id: &str, profile: UserProfile) {
    self
      .documents
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert((collection.to_string(), id.to_string()), profile);
  }
}

impl ProfileStore for MemoryProfileStore {
  async fn get_profile(&self, collection: &str, id: &str) -> Result<Option<UserProfile>, ProfileError> {
    let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(documents.get(&(collection.to_string(), id.to_string())).cloned())
  }
}

/// JSON 文件文档存储，文件形如 `{ "users": { "<uid>": { "username": "..." } } }`
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
  path: PathBuf,
}

impl JsonProfileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl FromUrlWithScheme for JsonProfileStore {
  const SCHEME: &'static str = "file";
}

impl FromUrl for JsonProfileStore {
  type Error = ProfileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ProfileError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(Self::new(url.path()))
  }
}

impl ProfileStore for JsonProfileStore {
  async fn get_profile(&self, collection: &str, id: &str) -> Result<Option<UserProfile>, ProfileError> {
    let data = tokio::fs::read(&self.path).await?;
    let mut collections: HashMap<String, HashMap<String, UserProfile>> =
      serde_json::from_slice(&data)?;
    Ok(
      collections
        .remove(collection)
        .and_then(|mut documents| documents.remove(id)),
    )
  }
}

/// 根据用户身份解析显示名称
pub struct ProfileResolver<P> {
  store: P,
}

impl<P: ProfileStore> ProfileResolver<P> {
  pub fn new(store: P) -> Self {
    Self { store }
  }

  /// 无用户返回 `None`；文档缺失返回 `Unknown User`；查询出错返回 `Guest`
  pub async fn display_name(&self, user: Option<&UserIdentity>) -> Option<String> {
    let user = user?;
    let name = match self.store.get_profile(USERS_COLLECTION, &user.uid).await {
      Ok(Some(UserProfile {
        username: Some(username),
      })) => username,
      Ok(_) => {
        debug!("用户 {} 没有资料文档", user.uid);
        UNKNOWN_USER.to_string()
      }
      Err(e) => {
        warn!("读取用户 {} 资料失败: {}", user.uid, e);
        GUEST.to_string()
      }
    };
    Some(name)
  }
}

/// 当前用户及其显示名称
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
  pub user: Option<UserIdentity>,
  pub username: Option<String>,
  pub loading: bool,
}

pub async fn load_user_data<S: Session, P: ProfileStore>(
  session: &S,
  resolver: &ProfileResolver<P>,
) -> UserData {
  if session.is_loading() {
    return UserData {
      user: None,
      username: None,
      loading: true,
    };
  }
  let user = session.current_user();
  let username = resolver.display_name(user.as_ref()).await;
  UserData {
    user,
    username,
    loading: false,
  }
}
