//! Redfish Authentication
//!
//! Holds session-token state for `X-Auth-Token` authentication and decides
//! which credentials a request carries.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Credentials attached to a single request
#[derive(Clone)]
pub enum Auth {
    Anonymous,
    Basic { username: String, password: String },
    Token(String),
}

impl std::fmt::Debug for Auth {
    // Security: never print secrets
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Anonymous => write!(f, "Anonymous"),
            Auth::Basic { username, .. } => write!(f, "Basic({})", username),
            Auth::Token(_) => write!(f, "Token(***)"),
        }
    }
}

/// Active session as issued by the service
#[derive(Clone)]
pub struct SessionState {
    pub token: String,
    /// Session resource, deleted on logout
    pub location: Option<String>,
}

/// Shared session holder
#[derive(Clone, Default)]
pub struct Session {
    state: Arc<RwLock<Option<SessionState>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session token, if logged in
    pub async fn token(&self) -> Option<String> {
        let state = self.state.read().await;
        state.as_ref().map(|s| s.token.clone())
    }

    pub async fn is_active(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn location(&self) -> Option<String> {
        let state = self.state.read().await;
        state.as_ref().and_then(|s| s.location.clone())
    }

    /// Remember a freshly issued token
    pub async fn store(&self, token: String, location: Option<String>) {
        let mut state = self.state.write().await;
        *state = Some(SessionState { token, location });
        tracing::debug!("Session token cached");
    }

    /// Forget the session, returning what was held
    pub async fn take(&self) -> Option<SessionState> {
        self.state.write().await.take()
    }
}
