use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote endpoint paths, joined onto [`ApiConfig::base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub authenticate: String,
    pub logout: String,
    /// Path used for every model operation.
    pub object: String,
    pub common: String,
    pub report: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authenticate: "/web/session/authenticate".to_string(),
            logout: "/web/session/logout".to_string(),
            object: "/xmlrpc/2/object".to_string(),
            common: "/xmlrpc/2/common".to_string(),
            report: "/xmlrpc/2/report".to_string(),
        }
    }
}

/// Retry settings for read-only operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one. `1` disables retry.
    pub attempts: u32,
    /// Delay before the first retry, doubled on each further retry.
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Client configuration.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// base_url = "https://erp.example.com"
/// database = "mycompany"
/// timeout_ms = 10000
///
/// [retry]
/// attempts = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server root (e.g. "http://localhost:8069").
    pub base_url: String,

    /// Database used when `login` is not given one and none was restored.
    pub database: Option<String>,

    pub endpoints: Endpoints,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Default `limit` for `search_read`.
    pub page_size: u64,

    pub retry: RetrySettings,

    /// Server API version this client targets. Informational.
    pub version: String,

    /// Extra headers sent with every object call.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8069".to_string(),
            database: None,
            endpoints: Endpoints::default(),
            timeout_ms: 30_000,
            page_size: 80,
            retry: RetrySettings::default(),
            version: "17.0".to_string(),
            default_headers: BTreeMap::new(),
        }
    }
}

/// Fields a caller may override at `initialize` time. `None` keeps the
/// configured value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverride {
    pub base_url: Option<String>,
    pub database: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ApiConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load from a TOML file, or return the defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, crate::StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| crate::StoreError::Serialization(e.to_string()))
    }

    /// Return a copy with the override's `Some` fields applied.
    pub fn merged(&self, ov: &ConfigOverride) -> Self {
        let mut merged = self.clone();
        if let Some(url) = &ov.base_url {
            merged.base_url = url.clone();
        }
        if let Some(db) = &ov.database {
            merged.database = Some(db.clone());
        }
        if let Some(ms) = ov.timeout_ms {
            merged.timeout_ms = ms;
        }
        merged
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Join an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn authenticate_url(&self) -> String {
        self.url(&self.endpoints.authenticate)
    }

    pub fn logout_url(&self) -> String {
        self.url(&self.endpoints.logout)
    }

    pub fn object_url(&self) -> String {
        self.url(&self.endpoints.object)
    }
}
