//! Schema document loading
//!
//! The schema is compiled once and reused for every row.

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::info;

/// One failed schema constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer into the document ("" is the root)
    pub instance_path: String,
    /// JSON pointer into the schema naming the failed keyword
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "{} (at {}, schema {})", self.message, at, self.schema_path)
    }
}

/// Compiled JSON Schema
pub struct SchemaDocument {
    validator: jsonschema::Validator,
}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDocument").finish_non_exhaustive()
    }
}

impl SchemaDocument {
    /// Read, parse and compile a schema file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Schema(format!("Cannot read schema {}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Schema(format!("Schema {} is not valid JSON: {}", path.display(), e))
        })?;
        let schema = Self::from_value(&value)?;
        info!("Loaded JSON schema {}", path.display());
        Ok(schema)
    }

    /// Compile an already parsed schema
    pub fn from_value(value: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(value)
            .map_err(|e| Error::Schema(format!("Invalid JSON schema: {}", e)))?;
        Ok(Self { validator })
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.validator.is_valid(document)
    }

    /// Every constraint the document breaks; empty when it conforms
    pub fn violations(&self, document: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(document)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaDocument {
        SchemaDocument::from_value(&json!({
            "type": "object",
            "required": ["valid"],
            "properties": {
                "valid": { "type": "boolean" },
                "count": { "type": "integer", "minimum": 0 }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_conforming_document_has_no_violations() {
        let schema = schema();
        let doc = json!({"valid": true, "count": 3});
        assert!(schema.is_valid(&doc));
        assert!(schema.violations(&doc).is_empty());
    }

    #[test]
    fn test_reports_every_violation() {
        let schema = schema();
        let doc = json!({"count": -1});
        let violations = schema.violations(&doc);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.message.contains("valid")));
        assert!(violations.iter().any(|v| v.instance_path == "/count"));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let err = SchemaDocument::from_value(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_missing_schema_file() {
        let err = SchemaDocument::load(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(err.to_string().contains("Cannot read schema"));
    }
}
