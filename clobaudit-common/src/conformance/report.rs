//! Per-row outcomes and the aggregated report

use super::Violation;
use std::fmt;

/// Failed ids listed in the verdict line; the per-row log has the rest
const SUMMARY_ID_LIMIT: usize = 20;

/// Why a row's document was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The payload column is SQL NULL
    NullPayload,
    /// The payload is not parseable as JSON
    Unparseable(String),
    /// The document parsed but broke one or more schema constraints
    SchemaViolations(Vec<Violation>),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NullPayload => write!(f, "payload is NULL"),
            FailureReason::Unparseable(msg) => write!(f, "payload is not valid JSON: {}", msg),
            FailureReason::SchemaViolations(violations) => {
                let parts: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join("; "))
            }
        }
    }
}

/// Outcome for a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Valid,
    Invalid(FailureReason),
}

impl RowOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, RowOutcome::Valid)
    }
}

/// A rejected row, keyed by its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub id: i64,
    pub reason: FailureReason,
}

/// Aggregated result of a conformance scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformanceReport {
    pub table: String,
    pub rows_checked: usize,
    pub failures: Vec<RowFailure>,
}

impl ConformanceReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Fold one row's outcome into the report
    pub fn record(&mut self, id: i64, outcome: RowOutcome) {
        self.rows_checked += 1;
        if let RowOutcome::Invalid(reason) = outcome {
            self.failures.push(RowFailure { id, reason });
        }
    }

    /// True iff no visited row was invalid (vacuously true for no rows)
    pub fn is_conformant(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.rows_checked - self.failures.len()
    }

    pub fn failed_ids(&self) -> Vec<i64> {
        self.failures.iter().map(|f| f.id).collect()
    }

    /// Single verdict line for the end of the log
    pub fn summary(&self) -> String {
        if self.is_conformant() {
            format!(
                "All {} rows of {} conform to the schema",
                self.rows_checked, self.table
            )
        } else {
            let mut ids: Vec<String> = self
                .failures
                .iter()
                .take(SUMMARY_ID_LIMIT)
                .map(|f| f.id.to_string())
                .collect();
            if self.failures.len() > SUMMARY_ID_LIMIT {
                ids.push(format!("… {} more", self.failures.len() - SUMMARY_ID_LIMIT));
            }
            format!(
                "{} of {} rows of {} do not conform to the schema (ids: {}); see log for details",
                self.failures.len(),
                self.rows_checked,
                self.table,
                ids.join(", ")
            )
        }
    }
}
