//! Authentication context shared by front ends.
//!
//! Owns the [`SessionClient`] for the lifetime of the application and
//! serializes every session mutation behind one lock, so concurrent
//! login/logout calls apply in lock order rather than response order.

use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::client::SessionClient;
use crate::config::ConfigOverride;

/// The logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: i64,
    pub db: Option<String>,
}

/// Result of [`AuthContext::login`]. Failures carry the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: Option<String>,
}

/// Snapshot returned by [`AuthContext::check_auth_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub user: Option<AuthUser>,
}

pub struct AuthContext {
    client: Mutex<SessionClient>,
    overrides: ConfigOverride,
}

impl AuthContext {
    pub fn new(client: SessionClient, overrides: ConfigOverride) -> Self {
        Self {
            client: Mutex::new(client),
            overrides,
        }
    }

    /// Re-initialize the client from storage and report the result.
    pub async fn check_auth_status(&self) -> AuthState {
        let mut client = self.client.lock().await;
        client.initialize(&self.overrides).await;
        state_of(&client)
    }

    pub async fn login(&self, username: &str, password: &str, database: Option<&str>) -> AuthOutcome {
        let mut client = self.client.lock().await;
        match client.login(username, password, database).await {
            Ok(_) => AuthOutcome {
                success: true,
                message: None,
            },
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "login failed");
                AuthOutcome {
                    success: false,
                    message: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn logout(&self) {
        self.client.lock().await.logout().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.lock().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<AuthUser> {
        state_of(&*self.client.lock().await).user
    }

    /// Exclusive access to the client for model calls.
    pub async fn client(&self) -> MutexGuard<'_, SessionClient> {
        self.client.lock().await
    }
}

fn state_of(client: &SessionClient) -> AuthState {
    let user = client.user().map(|(uid, db)| AuthUser {
        uid,
        db: db.map(str::to_string),
    });
    AuthState {
        authenticated: user.is_some(),
        user,
    }
}
