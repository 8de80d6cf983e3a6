//! Login / logout / status commands.

use std::path::Path;

use anyhow::Result;

use super::open_auth;

/// Log into the current context's server and persist the session.
pub async fn login(username: &str, password: &str, database: Option<&str>, client_config_path: &Path) -> Result<()> {
    let auth = open_auth(client_config_path)?;
    auth.check_auth_status().await;

    let outcome = auth.login(username, password, database).await;
    if !outcome.success {
        anyhow::bail!("Login failed: {}", outcome.message.unwrap_or_default());
    }

    if let Some(user) = auth.user().await {
        println!("Logged in as {} (uid {}).", username, user.uid);
        println!("Database: {}", user.db.as_deref().unwrap_or("-"));
    }
    Ok(())
}

/// End the session. Local state is cleared even if the server is unreachable.
pub async fn logout(client_config_path: &Path) -> Result<()> {
    let auth = open_auth(client_config_path)?;
    if !auth.check_auth_status().await.authenticated {
        println!("Not logged in.");
        return Ok(());
    }
    auth.logout().await;
    println!("Logged out.");
    Ok(())
}

pub async fn status(client_config_path: &Path) -> Result<()> {
    let auth = open_auth(client_config_path)?;
    let state = auth.check_auth_status().await;
    let client = auth.client().await;

    println!("Server:    {}", client.config().base_url);
    println!("Database:  {}", client.session().database().unwrap_or("-"));
    match state.user {
        Some(user) => println!("Session:   logged in (uid {})", user.uid),
        None => println!("Session:   not logged in"),
    }
    Ok(())
}
