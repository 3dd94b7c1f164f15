// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/routes.rs - 页面路由与访问控制
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

use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::session::{AuthProvider, Session};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的路由: {0}")]
pub struct UnknownRoute(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Home,
  Login,
  Signup,
  Upload,
  History,
  Analytics,
}

impl Route {
  pub const ALL: [Route; 6] = [
    Route::Home,
    Route::Login,
    Route::Signup,
    Route::Upload,
    Route::History,
    Route::Analytics,
  ];

  pub fn path(self) -> &'static str {
    match self {
      Route::Home => "/",
      Route::Login => "/login",
      Route::Signup => "/signup",
      Route::Upload => "/upload",
      Route::History => "/history",
      Route::Analytics => "/analytics",
    }
  }

  /// 需要登录才能访问的页面
  pub fn is_protected(self) -> bool {
    matches!(self, Route::Upload | Route::History | Route::Analytics)
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

impl FromStr for Route {
  type Err = UnknownRoute;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };
    Route::ALL
      .into_iter()
      .find(|route| route.path() == path)
      .ok_or_else(|| UnknownRoute(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
  Render,
  /// 身份状态尚未确定
  Loading,
  Redirect(Route),
}

/// 受保护页面的访问守卫
pub fn guard<S: Session + ?Sized>(route: Route, session: &S) -> RouteDecision {
  if !route.is_protected() {
    return RouteDecision::Render;
  }
  if session.is_loading() {
    return RouteDecision::Loading;
  }
  match session.current_user() {
    Some(_) => RouteDecision::Render,
    None => {
      warn!("未登录，访问 {} 重定向到登录页", route);
      RouteDecision::Redirect(Route::Login)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
  Link { title: &'static str, route: Route },
  Logout,
}

impl NavItem {
  pub fn title(&self) -> &'static str {
    match self {
      NavItem::Link { title, .. } => title,
      NavItem::Logout => "Logout",
    }
  }
}

pub fn nav_items(signed_in: bool) -> Vec<NavItem> {
  let mut items = vec![NavItem::Link {
    title: "Home",
    route: Route::Home,
  }];
  if signed_in {
    items.push(NavItem::Logout);
  } else {
    items.push(NavItem::Link {
      title: "Login",
      route: Route::Login,
    });
    items.push(NavItem::Link {
      title: "Signup",
      route: Route::Signup,
    });
  }
  items
}

/// 登录表单提交，成功后跳转首页，失败返回认证服务的原始信息
pub async fn submit_login<P: AuthProvider>(auth: &P, email: &str, password: &str) -> Result<Route, String> {
  match auth.sign_in(email, password).await {
    Ok(user) => {
      info!("登录成功: {}", user.uid);
      Ok(Route::Home)
    }
    Err(e) => Err(e.to_string()),
  }
}

pub async fn submit_signup<P: AuthProvider>(auth: &P, email: &str, password: &str) -> Result<Route, String> {
  match auth.sign_up(email, password).await {
    Ok(user) => {
      info!("注册成功: {}", user.uid);
      Ok(Route::Home)
    }
    Err(e) => Err(e.to_string()),
  }
}

pub async fn logout<P: AuthProvider>(auth: &P) -> Result<Route, String> {
  auth.sign_out().await.map_err(|e| e.to_string())?;
  info!("已退出登录");
  Ok(Route::Home)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::{MemoryAuth, SessionError, UserIdentity};

  struct Pending;

  impl Session for Pending {
    fn current_user(&self) -> Option<UserIdentity> {
      None
    }

    fn is_loading(&self) -> bool {
      true
    }

    async fn id_token(&self) -> Result<String, SessionError> {
      Err(SessionError::NotSignedIn)
    }
  }

  #[test]
  fn paths_round_trip() {
    for route in Route::ALL {
      assert_eq!(route.path().parse::<Route>(), Ok(route));
    }
    assert_eq!("/history/".parse::<Route>(), Ok(Route::History));
    assert!("/admin".parse::<Route>().is_err());
  }

  #[tokio::test]
  async fn protected_routes_redirect_until_signed_in() {
    let auth = MemoryAuth::new();
    assert_eq!(guard(Route::Upload, &auth), RouteDecision::Redirect(Route::Login));
    assert_eq!(guard(Route::Home, &auth), RouteDecision::Render);
    assert_eq!(guard(Route::Login, &auth), RouteDecision::Render);

    auth.sign_up("a@b.com", "secret1").await.unwrap();
    assert_eq!(guard(Route::Analytics, &auth), RouteDecision::Render);
  }

  #[test]
  fn loading_session_shows_placeholder() {
    assert_eq!(guard(Route::History, &Pending), RouteDecision::Loading);
    assert_eq!(guard(Route::Signup, &Pending), RouteDecision::Render);
  }

  #[test]
  fn navigation_depends_on_sign_in() {
    let titles = |signed_in| nav_items(signed_in).iter().map(NavItem::title).collect::<Vec<_>>();
    assert_eq!(titles(true), vec!["Home", "Logout"]);
    assert_eq!(titles(false), vec!["Home", "Login", "Signup"]);
  }

  #[tokio::test]
  async fn auth_forms_navigate_home_or_show_message() {
    let auth = MemoryAuth::new();
    assert_eq!(
      submit_signup(&auth, "a@b.com", "123").await,
      Err("Password should be at least 6 characters.".to_string())
    );
    assert_eq!(submit_signup(&auth, "a@b.com", "secret1").await, Ok(Route::Home));
    assert_eq!(logout(&auth).await, Ok(Route::Home));
    assert_eq!(
      submit_login(&auth, "a@b.com", "wrong").await,
      Err("Invalid email or password.".to_string())
    );
    assert_eq!(submit_login(&auth, "a@b.com", "secret1").await, Ok(Route::Home));
  }
}
