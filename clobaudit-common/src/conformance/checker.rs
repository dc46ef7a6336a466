//! Table scan validating each row's JSON payload
//!
//! Every row is visited exactly once. A row whose payload is NULL, not JSON,
//! or not schema-conformant is recorded and the scan continues, so one run
//! surfaces every bad record. Query, decode and connection failures abort
//! the scan with an `Err`.

use super::{ConformanceReport, FailureReason, RowOutcome, SchemaDocument};
use crate::config::{is_sql_identifier, ConformanceConfig};
use crate::db::Database;
use crate::{Error, Result};
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::Row;
use tracing::{info, warn};

/// Table holding one JSON document per row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    pub table: String,
    pub id_column: String,
    pub data_column: String,
}

impl TargetTable {
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        data_column: impl Into<String>,
    ) -> Result<Self> {
        let target = Self {
            table: table.into(),
            id_column: id_column.into(),
            data_column: data_column.into(),
        };
        for name in [&target.table, &target.id_column, &target.data_column] {
            if !is_sql_identifier(name) {
                return Err(Error::Config(format!(
                    "{:?} is not a plain SQL identifier",
                    name
                )));
            }
        }
        Ok(target)
    }

    pub fn from_config(config: &ConformanceConfig) -> Result<Self> {
        Self::new(&config.table, &config.id_column, &config.data_column)
    }

    /// Payload is cast to BLOB so TEXT and BLOB columns decode the same way
    fn select_sql(&self) -> String {
        format!(
            "SELECT {}, CAST({} AS BLOB) FROM {}",
            self.id_column, self.data_column, self.table
        )
    }
}

/// Classify one payload against the schema
pub fn evaluate_payload(schema: &SchemaDocument, payload: Option<&[u8]>) -> RowOutcome {
    let Some(bytes) = payload else {
        return RowOutcome::Invalid(FailureReason::NullPayload);
    };

    let document: Value = match serde_json::from_slice(bytes) {
        Ok(doc) => doc,
        Err(e) => return RowOutcome::Invalid(FailureReason::Unparseable(e.to_string())),
    };

    let violations = schema.violations(&document);
    if violations.is_empty() {
        RowOutcome::Valid
    } else {
        RowOutcome::Invalid(FailureReason::SchemaViolations(violations))
    }
}

/// Scan `target` and validate every row against `schema`
pub async fn check_table(
    db: &mut Database,
    target: &TargetTable,
    schema: &SchemaDocument,
) -> Result<ConformanceReport> {
    info!("Checking documents in {}.{}", target.table, target.data_column);

    let sql = target.select_sql();
    let mut report = ConformanceReport::new(&target.table);

    let mut rows = sqlx::query(&sql).fetch(db.conn());
    while let Some(row) = rows.try_next().await? {
        let id: i64 = row.try_get(0)?;
        let payload: Option<Vec<u8>> = row.try_get(1)?;

        let outcome = evaluate_payload(schema, payload.as_deref());
        match &outcome {
            RowOutcome::Valid => info!("Row {}: document conforms to the schema", id),
            RowOutcome::Invalid(reason) => {
                warn!("Row {}: document does not conform to the schema: {}", id, reason)
            }
        }
        report.record(id, outcome);
    }

    info!("{}", report.summary());
    Ok(report)
}
