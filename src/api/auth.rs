//! Signed-in session shared between the HTTP client and the UI.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Staff,
  ShopAdmin,
  Retailer,
  Doctor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
  pub id: String,
  pub name: String,
  pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
  pub token: String,
  pub user: Option<AuthUser>,
}

/// Notifications for anyone holding a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
  SignedIn,
  SignedOut,
  /// The API rejected the token; the session has already been cleared.
  Unauthorized,
}

/// Process-wide auth state, passed explicitly to whoever needs it.
#[derive(Clone)]
pub struct AuthContext {
  session: Arc<RwLock<Option<AuthSession>>>,
  events: broadcast::Sender<AuthEvent>,
}

impl AuthContext {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(16);
    Self {
      session: Arc::new(RwLock::new(None)),
      events,
    }
  }

  pub fn with_token(token: impl Into<String>) -> Self {
    let ctx = Self::new();
    ctx.set(AuthSession {
      token: token.into(),
      user: None,
    });
    ctx
  }

  pub fn get(&self) -> Option<AuthSession> {
    self
      .session
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn token(&self) -> Option<String> {
    self
      .session
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .as_ref()
      .map(|s| s.token.clone())
  }

  pub fn is_signed_in(&self) -> bool {
    self.token().is_some()
  }

  pub fn set(&self, session: AuthSession) {
    *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    let _ = self.events.send(AuthEvent::SignedIn);
  }

  pub fn clear(&self) {
    let had_session = self
      .session
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .take()
      .is_some();
    if had_session {
      let _ = self.events.send(AuthEvent::SignedOut);
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
    self.events.subscribe()
  }

  /// Clear the session and tell subscribers to send the user to sign-in.
  pub fn handle_unauthorized(&self) {
    info!("API rejected credentials, clearing session");
    self
      .session
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .take();
    let _ = self.events.send(AuthEvent::Unauthorized);
  }
}

impl Default for AuthContext {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for AuthContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AuthContext")
      .field("signed_in", &self.is_signed_in())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_get_clear() {
    let ctx = AuthContext::new();
    assert!(ctx.get().is_none());

    ctx.set(AuthSession {
      token: "abc".to_string(),
      user: Some(AuthUser {
        id: "u1".to_string(),
        name: "Mira".to_string(),
        role: Role::ShopAdmin,
      }),
    });
    assert_eq!(ctx.token().as_deref(), Some("abc"));

    ctx.clear();
    assert!(!ctx.is_signed_in());
  }

  #[test]
  fn test_clones_share_state() {
    let ctx = AuthContext::with_token("t");
    let other = ctx.clone();
    other.clear();
    assert!(ctx.token().is_none());
  }

  #[tokio::test]
  async fn test_unauthorized_notifies_subscribers() {
    let ctx = AuthContext::with_token("expired");
    let mut events = ctx.subscribe();

    ctx.handle_unauthorized();

    assert_eq!(events.recv().await.unwrap(), AuthEvent::Unauthorized);
    assert!(!ctx.is_signed_in());
  }

  #[test]
  fn test_role_wire_names() {
    let role: Role = serde_json::from_str("\"SHOP_ADMIN\"").unwrap();
    assert_eq!(role, Role::ShopAdmin);
  }
}
