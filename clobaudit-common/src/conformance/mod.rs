//! JSON Schema conformance checking of stored documents

pub mod checker;
pub mod report;
pub mod schema;

pub use checker::{check_table, evaluate_payload, TargetTable};
pub use report::{ConformanceReport, FailureReason, RowFailure, RowOutcome};
pub use schema::{SchemaDocument, Violation};
