//! Client-side context management.
//!
//! Reads/writes `~/.odoo/config.toml`. Sessions live next to it in
//! `~/.odoo/sessions/<context>.redb`.

use std::path::{Path, PathBuf};

use odoo_session::ApiConfig;
use serde::{Deserialize, Serialize};

/// A single context: one server + database pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "prod").
    pub name: String,

    /// Server URL (e.g. "https://erp.example.com").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Database to log into.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
}

impl Context {
    /// Client configuration for this context.
    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig {
            base_url: self.server.clone(),
            ..Default::default()
        };
        if !self.database.is_empty() {
            config.database = Some(self.database.clone());
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(n) = self.page_size {
            config.page_size = n;
        }
        config
    }
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl ClientConfig {
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// A missing file reads as an empty config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    pub fn require_current(&self) -> anyhow::Result<&Context> {
        self.current()
            .ok_or_else(|| anyhow::anyhow!("No current context. Run `odoo use context <name>`."))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    pub fn upsert_context(&mut self, ctx: Context) {
        match self.get_mut(&ctx.name) {
            Some(existing) => *existing = ctx,
            None => self.contexts.push(ctx),
        }
    }

    /// Dropping the current context unsets `current-context`.
    pub fn remove_context(&mut self, name: &str) -> bool {
        if self.current_context == name {
            self.current_context.clear();
        }
        let before = self.contexts.len();
        self.contexts.retain(|c| c.name != name);
        self.contexts.len() != before
    }
}

/// Session store file for a context, beside the config file.
pub fn session_path(config_path: &Path, context: &str) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(dirs_path)
        .join("sessions")
        .join(format!("{}.redb", context))
}

/// `~/.odoo`
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".odoo")
}
