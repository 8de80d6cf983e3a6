//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{session_path, ClientConfig, Context};

/// Create (or replace) a context. The first context created becomes current.
pub fn create(name: &str, server: &str, database: Option<&str>, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    config.upsert_context(Context {
        name: name.to_string(),
        server: server.to_string(),
        database: database.unwrap_or_default().to_string(),
        ..Default::default()
    });
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
    config.save(client_config_path)?;

    println!("Context \"{}\" created.", name);
    println!("  Server:   {}", server);
    println!("  Database: {}", database.unwrap_or("-"));
    Ok(())
}

pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!("Run: odoo context create <name> --server <url>");
        return Ok(());
    }

    println!("{:2} {:20} {:40} {:20}", "", "NAME", "SERVER", "DATABASE");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let server = if ctx.server.is_empty() { "-" } else { &ctx.server };
        let database = if ctx.database.is_empty() { "-" } else { &ctx.database };
        println!("{:2} {:20} {:40} {:20}", marker, ctx.name, server, database);
    }
    Ok(())
}

pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    if !config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!("Context \"{}\" not found. Run `odoo context list` to see available contexts.", name);
    }

    config.current_context = name.to_string();
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

pub fn set(name: &str, server: Option<&str>, database: Option<&str>, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("Context \"{}\" not found.", name))?;
    if let Some(s) = server {
        ctx.server = s.to_string();
    }
    if let Some(d) = database {
        ctx.database = d.to_string();
    }

    config.save(client_config_path)?;
    println!("Context \"{}\" updated.", name);
    Ok(())
}

/// Delete a context and its stored session.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    if !config.remove_context(name) {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.save(client_config_path)?;

    let session = session_path(client_config_path, name);
    if session.exists() {
        std::fs::remove_file(&session)?;
    }

    println!("Context \"{}\" deleted.", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_use_set_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        create("prod", "https://erp.example.com", Some("mycompany"), &path).unwrap();
        create("stage", "https://stage.example.com", None, &path).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.current_context, "prod");
        assert_eq!(config.contexts.len(), 2);

        use_context("stage", &path).unwrap();
        set("stage", None, Some("staging"), &path).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        let current = config.current().unwrap();
        assert_eq!(current.name, "stage");
        assert_eq!(current.database, "staging");
        assert_eq!(current.server, "https://stage.example.com");

        assert!(use_context("missing", &path).is_err());
        delete("stage", &path).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert!(config.current().is_none());
        assert!(delete("stage", &path).is_err());
    }
}
