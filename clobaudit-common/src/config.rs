//! Configuration loading and path resolution
//!
//! Resolution order for the runner:
//! 1. `clobaudit.toml` in the working directory
//! 2. Compiled defaults (missing config file is a warning, never fatal)
//!
//! `DATABASE_URL` overrides `[database] url` in either case.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "clobaudit.toml";

/// Environment variable overriding the database URL
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level audit configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationsConfig,
    pub conformance: ConformanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite::memory:` or `sqlite://audit.db?mode=rwc`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Root changelog file
    pub changelog: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            changelog: PathBuf::from("resources/db/changelog/root.toml"),
        }
    }
}

/// Which table to scan and which schema its documents must satisfy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    pub schema: PathBuf,
    pub table: String,
    pub id_column: String,
    pub data_column: String,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            schema: PathBuf::from("resources/data_schema.json"),
            table: "TABLE_WITH_CLOB".to_string(),
            id_column: "ID".to_string(),
            data_column: "DATA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive (RUST_LOG still wins)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuditConfig {
    /// Parse a config file. Relative paths inside it resolve against the
    /// file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let mut config: AuditConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", path.display(), e)))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.rebase_paths(base);
        Ok(config)
    }

    /// Load `clobaudit.toml` from `dir`, falling back to compiled defaults
    /// rooted at `dir` when the file does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            return Self::load(&path);
        }

        warn!(
            "No {} found in {}, using compiled defaults",
            CONFIG_FILE_NAME,
            dir.display()
        );
        let mut config = Self::default();
        config.rebase_paths(dir);
        Ok(config)
    }

    /// Apply `DATABASE_URL` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Database URL overridden by {}", DATABASE_URL_ENV);
                self.database.url = url;
            }
        }
    }

    /// Reject values that would otherwise fail later in a less obvious way
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(Error::Config("database.url must not be empty".to_string()));
        }
        if self.migrations.changelog.as_os_str().is_empty() {
            return Err(Error::Config("migrations.changelog must not be empty".to_string()));
        }
        if self.conformance.schema.as_os_str().is_empty() {
            return Err(Error::Config("conformance.schema must not be empty".to_string()));
        }

        for (key, value) in [
            ("conformance.table", &self.conformance.table),
            ("conformance.id_column", &self.conformance.id_column),
            ("conformance.data_column", &self.conformance.data_column),
        ] {
            if !is_sql_identifier(value) {
                return Err(Error::Config(format!(
                    "{} must be a plain SQL identifier, got {:?}",
                    key, value
                )));
            }
        }

        Ok(())
    }

    fn rebase_paths(&mut self, base: &Path) {
        if self.migrations.changelog.is_relative() {
            self.migrations.changelog = base.join(&self.migrations.changelog);
        }
        if self.conformance.schema.is_relative() {
            self.conformance.schema = base.join(&self.conformance.schema);
        }
    }
}

/// Letters, digits and underscores, not starting with a digit
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
