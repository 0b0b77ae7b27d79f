//! Process configuration loaded once at startup.
//!
//! Values come from a JSON file (path in `BILLFLOW_CONFIG`, default `config.json`).
//! A missing file falls back to defaults. `DATABASE_URL`, `ADMIN_PASSWORD` and
//! `HTTP_PORT` take precedence over the file.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// `database_url` value that selects the in-memory document store.
pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string, or `memory://` for the in-memory store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Name of the documents table holding both collections.
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_user_collection")]
    pub user_collection: String,

    #[serde(default = "default_billing_collection")]
    pub billing_collection: String,

    /// Secret compared against the password half of admin basic-auth credentials.
    #[serde(default)]
    pub admin_password: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_database_url() -> String {
    MEMORY_URL.to_string()
}

fn default_database() -> String {
    "billflow".to_string()
}

fn default_user_collection() -> String {
    "users".to_string()
}

fn default_billing_collection() -> String {
    "billings".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            database: default_database(),
            user_collection: default_user_collection(),
            billing_collection: default_billing_collection(),
            admin_password: String::new(),
            http_port: default_http_port(),
        }
    }
}

impl Config {
    /// Load from the configured file, apply environment overrides and validate.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BILLFLOW_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database_url = url;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()) {
            self.admin_password = password;
        }
        if let Some(port) = lookup("HTTP_PORT").filter(|v| !v.is_empty()) {
            self.http_port = port
                .parse()
                .with_context(|| format!("HTTP_PORT must be a port number, got {port:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("database", &self.database),
            ("user_collection", &self.user_collection),
            ("billing_collection", &self.billing_collection),
        ] {
            if value.trim().is_empty() {
                bail!("{field} cannot be empty");
            }
        }
        // both stores share one table, keyed by collection
        if self.user_collection.trim() == self.billing_collection.trim() {
            bail!(
                "user_collection and billing_collection must differ (both are {:?})",
                self.user_collection
            );
        }
        if self.admin_password.is_empty() {
            bail!("admin_password cannot be empty");
        }
        Ok(())
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_URL
    }
}
