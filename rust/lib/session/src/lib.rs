//! Session-aware JSON-RPC client for Odoo.
//!
//! Authenticates against one database, persists the session so it
//! survives restarts, and forwards object calls (`search_read`,
//! `create`, `write`, ...) with the session attached.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use odoo_session::{ApiConfig, ConfigOverride, RedbSessionStore, SearchRead, SessionClient};
//!
//! let store = Arc::new(RedbSessionStore::open("session.redb".as_ref())?);
//! let mut client = SessionClient::http(ApiConfig::default(), store);
//! client.initialize(&ConfigOverride::default()).await;
//! if !client.is_authenticated() {
//!     client.login("admin", "admin", Some("mycompany")).await?;
//! }
//! let partners = client
//!     .search_read("res.partner", SearchRead::new().fields(["name"]).limit(10))
//!     .await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod rpc;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthContext, AuthOutcome, AuthState, AuthUser};
pub use client::{LoginOutcome, SearchRead, SessionClient};
pub use config::{ApiConfig, ConfigOverride, Endpoints, RetrySettings};
pub use error::{error_code, SessionError, StoreError};
pub use retry::RetryPolicy;
pub use session::{Credentials, PersistedSession, Session};
pub use store::{MemorySessionStore, RedbSessionStore, SessionStore, SESSION_KEY};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse, SESSION_HEADER};
