//! Changelog loading
//!
//! A changelog is a TOML file listing change-sets in the order they must be
//! applied. Each change-set carries either inline SQL or a path to a SQL file
//! relative to the changelog:
//!
//! ```toml
//! [[changeset]]
//! id = 1
//! description = "create table_with_clob"
//! file = "changes/0001_create_table_with_clob.sql"
//!
//! [[changeset]]
//! id = 2
//! description = "add index"
//! sql = "CREATE INDEX idx_data ON TABLE_WITH_CLOB (ID)"
//! run_in_transaction = true
//! ```
//!
//! Loading validates the whole changelog before any SQL reaches the database.

use crate::{Error, Result};
use futures::future::BoxFuture;
use serde::Deserialize;
use sqlx::error::BoxDynError;
use sqlx::migrate::{Migration, MigrationSource, MigrationType};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One ordered migration step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub id: i64,
    pub description: String,
    pub sql: String,
    pub run_in_transaction: bool,
}

/// Validated, ordered list of change-sets
#[derive(Debug, Clone)]
pub struct Changelog {
    path: PathBuf,
    changesets: Vec<ChangeSet>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChangelog {
    #[serde(default)]
    changeset: Vec<RawChangeSet>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChangeSet {
    id: i64,
    description: String,
    sql: Option<String>,
    file: Option<PathBuf>,
    #[serde(default = "default_true")]
    run_in_transaction: bool,
}

fn default_true() -> bool {
    true
}

impl Changelog {
    /// Read and validate a changelog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Changelog(format!("Cannot read changelog {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&content, base, path)
    }

    /// Parse changelog text; `base` resolves relative `file` entries
    pub fn from_toml(content: &str, base: &Path) -> Result<Self> {
        Self::parse(content, base, Path::new("<inline>"))
    }

    fn parse(content: &str, base: &Path, origin: &Path) -> Result<Self> {
        let raw: RawChangelog = toml::from_str(content).map_err(|e| {
            Error::Changelog(format!("Malformed changelog {}: {}", origin.display(), e))
        })?;

        if raw.changeset.is_empty() {
            return Err(Error::Changelog(format!(
                "Changelog {} declares no change-sets",
                origin.display()
            )));
        }

        let mut changesets = Vec::with_capacity(raw.changeset.len());
        let mut previous_id: Option<i64> = None;

        for entry in raw.changeset {
            if entry.id <= 0 {
                return Err(Error::Changelog(format!(
                    "Change-set id must be positive, got {}",
                    entry.id
                )));
            }
            if let Some(prev) = previous_id {
                if entry.id <= prev {
                    return Err(Error::Changelog(format!(
                        "Change-set ids must increase in declaration order: {} follows {}",
                        entry.id, prev
                    )));
                }
            }
            previous_id = Some(entry.id);

            if entry.description.trim().is_empty() {
                return Err(Error::Changelog(format!(
                    "Change-set {} has an empty description",
                    entry.id
                )));
            }

            let sql = match (entry.sql, entry.file) {
                (Some(sql), None) => sql,
                (None, Some(file)) => {
                    let file_path = base.join(&file);
                    std::fs::read_to_string(&file_path).map_err(|e| {
                        Error::Changelog(format!(
                            "Change-set {}: cannot read {}: {}",
                            entry.id,
                            file_path.display(),
                            e
                        ))
                    })?
                }
                (Some(_), Some(_)) => {
                    return Err(Error::Changelog(format!(
                        "Change-set {} sets both `sql` and `file`",
                        entry.id
                    )));
                }
                (None, None) => {
                    return Err(Error::Changelog(format!(
                        "Change-set {} needs either `sql` or `file`",
                        entry.id
                    )));
                }
            };

            if sql.trim().is_empty() {
                return Err(Error::Changelog(format!(
                    "Change-set {} has no SQL",
                    entry.id
                )));
            }

            changesets.push(ChangeSet {
                id: entry.id,
                description: entry.description,
                sql,
                run_in_transaction: entry.run_in_transaction,
            });
        }

        debug!(
            "Loaded changelog {} with {} change-sets",
            origin.display(),
            changesets.len()
        );

        Ok(Self {
            path: origin.to_path_buf(),
            changesets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn changesets(&self) -> &[ChangeSet] {
        &self.changesets
    }

    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }

    /// Convert to the migrations understood by `sqlx::migrate::Migrator`
    pub fn to_migrations(&self) -> Vec<Migration> {
        self.changesets
            .iter()
            .map(|cs| {
                Migration::new(
                    cs.id,
                    Cow::Owned(cs.description.clone()),
                    MigrationType::Simple,
                    Cow::Owned(cs.sql.clone()),
                    !cs.run_in_transaction,
                )
            })
            .collect()
    }
}

impl<'s> MigrationSource<'s> for Changelog {
    fn resolve(self) -> BoxFuture<'s, std::result::Result<Vec<Migration>, BoxDynError>> {
        Box::pin(async move { Ok(self.to_migrations()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Changelog> {
        Changelog::from_toml(content, Path::new("."))
    }

    #[test]
    fn test_inline_changesets_keep_declared_order() {
        let changelog = parse(
            r#"
            [[changeset]]
            id = 1
            description = "create"
            sql = "CREATE TABLE a (id INTEGER)"

            [[changeset]]
            id = 5
            description = "no tx"
            sql = "CREATE TABLE b (id INTEGER)"
            run_in_transaction = false
            "#,
        )
        .unwrap();

        let ids: Vec<i64> = changelog.changesets().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert!(changelog.changesets()[0].run_in_transaction);
        assert!(!changelog.changesets()[1].run_in_transaction);

        let migrations = changelog.to_migrations();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[1].version, 5);
        assert!(migrations[1].no_tx);
    }

    #[test]
    fn test_rejects_out_of_order_ids() {
        let err = parse(
            r#"
            [[changeset]]
            id = 2
            description = "second"
            sql = "SELECT 1"

            [[changeset]]
            id = 1
            description = "first"
            sql = "SELECT 1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Changelog(_)));
        assert!(err.to_string().contains("increase"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = parse(
            r#"
            [[changeset]]
            id = 1
            description = "a"
            sql = "SELECT 1"

            [[changeset]]
            id = 1
            description = "b"
            sql = "SELECT 1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Changelog(_)));
    }

    #[test]
    fn test_rejects_sql_and_file_together() {
        let err = parse(
            r#"
            [[changeset]]
            id = 1
            description = "both"
            sql = "SELECT 1"
            file = "x.sql"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_rejects_missing_body() {
        let err = parse(
            r#"
            [[changeset]]
            id = 1
            description = "empty"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("either"));
    }

    #[test]
    fn test_rejects_empty_changelog_and_bad_toml() {
        assert!(matches!(parse(""), Err(Error::Changelog(_))));
        assert!(matches!(parse("[[changeset]\nid ="), Err(Error::Changelog(_))));
        assert!(matches!(
            parse("[[changeset]]\nid = 1\ndescription = \"x\"\nsql = \"SELECT 1\"\nauthor = \"me\""),
            Err(Error::Changelog(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let err = parse(
            r#"
            [[changeset]]
            id = 0
            description = "zero"
            sql = "SELECT 1"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
