//! clobaudit library - migrate, then audit stored JSON documents
//!
//! A run holds one database connection for its whole duration:
//! 1. apply the changelog (aborts on the first failing change-set)
//! 2. load the schema and validate every row of the target table
//!
//! The connection is closed on every exit path.

use clobaudit_common::conformance::{check_table, TargetTable};
use clobaudit_common::db::{run_changelog_file, Database, MigrationReport};
use clobaudit_common::{AuditConfig, ConformanceReport, Result, SchemaDocument};
use tracing::info;

/// Everything a completed run learned
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub migrations: MigrationReport,
    pub conformance: ConformanceReport,
}

impl AuditOutcome {
    /// True iff every row validated
    pub fn passed(&self) -> bool {
        self.conformance.is_conformant()
    }
}

/// Run migrations and the conformance check described by `config`
///
/// `Err` means the run could not complete (infrastructure or migration
/// failure). Rows that fail validation are reported through
/// [`AuditOutcome::passed`].
pub async fn run_audit(config: &AuditConfig) -> Result<AuditOutcome> {
    config.validate()?;
    let target = TargetTable::from_config(&config.conformance)?;

    let mut db = Database::connect(&config.database.url).await?;
    let result = audit(&mut db, config, &target).await;
    db.close().await;
    result
}

async fn audit(
    db: &mut Database,
    config: &AuditConfig,
    target: &TargetTable,
) -> Result<AuditOutcome> {
    info!("Running migrations...");
    let migrations = run_changelog_file(db, &config.migrations.changelog).await?;
    info!("Running migrations...DONE");

    let schema = SchemaDocument::load(&config.conformance.schema)?;
    let conformance = check_table(db, target, &schema).await?;

    Ok(AuditOutcome {
        migrations,
        conformance,
    })
}

/// Initialize the tracing subscriber; `RUST_LOG` takes precedence over
/// `default_level`
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
