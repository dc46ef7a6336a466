//! # clobaudit Common Library
//!
//! Shared code for the clobaudit runner including:
//! - Error types and the crate `Result` alias
//! - Configuration loading
//! - Database connection handling
//! - Changelog loading and migration execution
//! - JSON Schema conformance checking of stored documents

pub mod config;
pub mod conformance;
pub mod db;
pub mod error;

pub use config::AuditConfig;
pub use conformance::{ConformanceReport, SchemaDocument};
pub use error::{Error, ErrorCategory, Result};
