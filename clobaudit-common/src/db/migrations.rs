//! Changelog-driven schema migrations
//!
//! Application itself is delegated to `sqlx::migrate::Migrator`, which keeps
//! its bookkeeping in the `_sqlx_migrations` table:
//! - change-sets already recorded there are skipped (checksums must still match)
//! - pending change-sets are applied in version order, each in its own
//!   transaction unless it opted out
//! - the first failure aborts the run; later change-sets are not attempted

use super::{Changelog, Database};
use crate::{Error, Result};
use sqlx::migrate::{Migrate, MigrateError, Migrator};
use std::collections::HashSet;
use tracing::{error, info};

/// What a migration run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Change-set ids applied by this run, in order
    pub applied: Vec<i64>,
    /// Change-set ids that were already present before this run
    pub already_applied: Vec<i64>,
}

impl MigrationReport {
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Load the changelog at `path` and apply it
pub async fn run_changelog_file(
    db: &mut Database,
    path: &std::path::Path,
) -> Result<MigrationReport> {
    info!("Loading changelog {}", path.display());
    let changelog = Changelog::load(path)?;
    run_changelog(db, changelog).await
}

/// Apply every pending change-set of `changelog`
pub async fn run_changelog(db: &mut Database, changelog: Changelog) -> Result<MigrationReport> {
    let conn = db.conn();

    conn.ensure_migrations_table()
        .await
        .map_err(bookkeeping_error)?;
    let recorded = applied_versions(conn).await?;

    let mut report = MigrationReport::default();
    let mut pending = Vec::new();
    for changeset in changelog.changesets() {
        if recorded.contains(&changeset.id) {
            report.already_applied.push(changeset.id);
        } else {
            pending.push((changeset.id, changeset.description.clone()));
        }
    }

    if pending.is_empty() {
        info!(
            "Database schema is up to date ({} change-sets already applied)",
            report.already_applied.len()
        );
    } else {
        info!(
            "Running database migrations: {} pending, {} already applied",
            pending.len(),
            report.already_applied.len()
        );
    }

    let migrator = Migrator::new(changelog).await?;

    if let Err(e) = migrator.run(&mut *conn).await {
        let recorded_after = applied_versions(conn).await.unwrap_or_default();
        log_run_failure(&e, &pending, &recorded_after);
        return Err(e.into());
    }

    for (id, description) in pending {
        info!("✓ Change-set {} applied: {}", id, description);
        report.applied.push(id);
    }

    info!("All migrations completed successfully");
    Ok(report)
}

async fn applied_versions(conn: &mut sqlx::SqliteConnection) -> Result<HashSet<i64>> {
    let applied = conn
        .list_applied_migrations()
        .await
        .map_err(bookkeeping_error)?;
    Ok(applied.into_iter().map(|m| m.version).collect())
}

/// Reading or creating `_sqlx_migrations` failing is a connection problem,
/// not a change-set problem
fn bookkeeping_error(e: MigrateError) -> Error {
    match e {
        MigrateError::Execute(e) => Error::Database(e),
        other => Error::Migration(other),
    }
}

/// Name the change-set responsible for a failed run
fn log_run_failure(e: &MigrateError, pending: &[(i64, String)], recorded_after: &HashSet<i64>) {
    match e {
        MigrateError::VersionMismatch(id) => {
            error!("Change-set {} was already applied but its SQL has changed: {}", id, e)
        }
        MigrateError::Dirty(id) => {
            error!("Change-set {} is recorded as partially applied: {}", id, e)
        }
        MigrateError::VersionMissing(id) => {
            error!("Change-set {} was applied but is missing from the changelog: {}", id, e)
        }
        _ => {
            // Pending ids recorded after the failure got through; the first
            // one still missing is the one that failed.
            match pending.iter().find(|(id, _)| !recorded_after.contains(id)) {
                Some((id, description)) => {
                    error!("Change-set {} ({}) failed to apply: {}", id, description, e)
                }
                None => error!("Migration run failed: {}", e),
            }
        }
    }
}
