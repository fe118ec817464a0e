//! Route surface and session-based redirects.

use tracing::debug;

use super::{AuthState, SessionGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Login,
  Home,
  Calendar,
  Work,
  Culture,
  Rule,
  User,
  NotFound,
}

impl Route {
  /// Parse a navigation target. Unknown paths map to [`Route::NotFound`].
  pub fn parse(path: &str) -> Self {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');

    match path {
      "" => Route::Home,
      "/login" => Route::Login,
      "/calendar" => Route::Calendar,
      "/work" => Route::Work,
      "/culture" => Route::Culture,
      "/rule" => Route::Rule,
      "/user" => Route::User,
      _ => Route::NotFound,
    }
  }

  pub fn path(&self) -> &'static str {
    match self {
      Route::Login => "/login",
      Route::Home => "/",
      Route::Calendar => "/calendar",
      Route::Work => "/work",
      Route::Culture => "/culture",
      Route::Rule => "/rule",
      Route::User => "/user",
      Route::NotFound => "/404",
    }
  }

  pub fn is_protected(&self) -> bool {
    !matches!(self, Route::Login)
  }
}

/// Applies the gate's mount-time decision to navigation requests.
#[derive(Clone)]
pub struct Router {
  gate: SessionGate,
}

impl Router {
  pub fn new(gate: SessionGate) -> Self {
    Self { gate }
  }

  /// Resolve where a navigation to `path` actually lands.
  ///
  /// An unresolved gate counts as unauthenticated.
  pub fn navigate(&self, path: &str) -> Route {
    let requested = Route::parse(path);

    let landed = match (self.gate.state(), requested) {
      (AuthState::Authenticated, Route::Login) => Route::Home,
      (AuthState::Authenticated, route) => route,
      (AuthState::Unauthenticated | AuthState::Unknown, route) if route.is_protected() => {
        Route::Login
      }
      (_, route) => route,
    };

    if landed != requested {
      debug!("Redirecting {} -> {}", path, landed.path());
    }
    landed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::gate::AuthCheck;
  use std::sync::Arc;

  struct Fixed(bool);

  impl AuthCheck for Fixed {
    fn is_authenticated(&self) -> bool {
      self.0
    }
  }

  fn mounted(authenticated: bool) -> Router {
    let gate = SessionGate::new(Arc::new(Fixed(authenticated)));
    gate.resolve();
    Router::new(gate)
  }

  #[test]
  fn test_parse_routes() {
    assert_eq!(Route::parse("/"), Route::Home);
    assert_eq!(Route::parse(""), Route::Home);
    assert_eq!(Route::parse("/calendar/"), Route::Calendar);
    assert_eq!(Route::parse("/user?tab=dues"), Route::User);
    assert_eq!(Route::parse("/nope"), Route::NotFound);
  }

  #[test]
  fn test_path_round_trip() {
    for route in [
      Route::Login,
      Route::Home,
      Route::Calendar,
      Route::Work,
      Route::Culture,
      Route::Rule,
      Route::User,
    ] {
      assert_eq!(Route::parse(route.path()), route);
    }
  }

  #[test]
  fn test_unauthenticated_redirects_to_login() {
    let router = mounted(false);
    assert_eq!(router.navigate("/"), Route::Login);
    assert_eq!(router.navigate("/calendar"), Route::Login);
    assert_eq!(router.navigate("/missing"), Route::Login);
    assert_eq!(router.navigate("/login"), Route::Login);
  }

  #[test]
  fn test_authenticated_login_redirects_home() {
    let router = mounted(true);
    assert_eq!(router.navigate("/login"), Route::Home);
    assert_eq!(router.navigate("/work"), Route::Work);
    assert_eq!(router.navigate("/missing"), Route::NotFound);
  }

  #[test]
  fn test_unresolved_gate_is_unauthenticated() {
    let router = Router::new(SessionGate::new(Arc::new(Fixed(true))));
    assert_eq!(router.navigate("/calendar"), Route::Login);
  }
}
