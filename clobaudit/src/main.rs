//! clobaudit - apply the changelog, then validate stored JSON documents
//!
//! Exit status:
//! - 0: migrations applied and every row conforms
//! - 1: at least one row does not conform
//! - 2: the run aborted (configuration, database, changelog, schema or
//!   migration failure)

use anyhow::{Context, Result};
use clobaudit::{init_tracing, run_audit};
use clobaudit_common::config::CONFIG_FILE_NAME;
use clobaudit_common::{AuditConfig, ErrorCategory};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not up yet; fall back to default level so the failure is visible
            init_tracing("info");
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.logging.level);

    // Log build identification immediately after tracing init
    info!(
        "Starting clobaudit v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    let config_file = std::env::current_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok()
        .filter(|path| path.exists());
    match config_file {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults (no {} found)", CONFIG_FILE_NAME),
    }
    info!("Database: {}", config.database.url);
    info!("Changelog: {}", config.migrations.changelog.display());
    info!("Schema: {}", config.conformance.schema.display());

    match run_audit(&config).await {
        Ok(outcome) if outcome.passed() => {
            info!("PASS: {}", outcome.conformance.summary());
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            error!("FAIL: {}", outcome.conformance.summary());
            ExitCode::from(1)
        }
        Err(e) => {
            match e.category() {
                ErrorCategory::Migration => error!("Aborted: migration failed: {}", e),
                ErrorCategory::Infrastructure => error!("Aborted: {}", e),
            }
            ExitCode::from(2)
        }
    }
}

fn load_config() -> Result<AuditConfig> {
    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let mut config = AuditConfig::load_or_default(&cwd).context("Failed to load configuration")?;
    config.apply_env_overrides();
    Ok(config)
}
