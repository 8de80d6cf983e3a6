pub mod context;
pub mod login;
pub mod record;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use odoo_session::{AuthContext, ConfigOverride, RedbSessionStore, SessionClient};
use tracing::debug;

use crate::config::{self, ClientConfig};

/// Client for the current context, not yet initialized.
fn build_client(client_config_path: &Path) -> Result<SessionClient> {
    let client_config = ClientConfig::load(client_config_path)?;
    let ctx = client_config.require_current()?;

    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `odoo context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let session_path = config::session_path(client_config_path, &ctx.name);
    debug!(context = %ctx.name, store = %session_path.display(), "opening session");
    let store = RedbSessionStore::open(&session_path)
        .map_err(|e| anyhow::anyhow!("failed to open session store: {}", e))?;
    Ok(SessionClient::http(ctx.api_config(), Arc::new(store)))
}

/// Build a client for the current context and restore its stored session.
pub async fn open_client(client_config_path: &Path) -> Result<SessionClient> {
    let mut client = build_client(client_config_path)?;
    client.initialize(&ConfigOverride::default()).await;
    Ok(client)
}

/// Auth context for the current context. Call `check_auth_status` to
/// restore the stored session.
pub fn open_auth(client_config_path: &Path) -> Result<AuthContext> {
    let client = build_client(client_config_path)?;
    Ok(AuthContext::new(client, ConfigOverride::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Context;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        let mut cfg = ClientConfig {
            current_context: "local".to_string(),
            ..Default::default()
        };
        cfg.upsert_context(Context {
            name: "local".to_string(),
            server: "http://127.0.0.1:9".to_string(),
            database: "demo".to_string(),
            ..Default::default()
        });
        cfg.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_open_auth_without_stored_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path());

        let auth = open_auth(&path).unwrap();
        let state = auth.check_auth_status().await;
        assert!(!state.authenticated);
        assert_eq!(auth.client().await.session().database(), Some("demo"));
        assert!(config::session_path(&path, "local").exists());
    }

    #[test]
    fn test_open_auth_requires_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_auth(&dir.path().join("config.toml")).err().unwrap();
        assert!(err.to_string().contains("No current context"));
    }
}
