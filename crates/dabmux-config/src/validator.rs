use jsonschema::Validator;
use serde_json::Value;

use crate::error::{ConfigError, Result};

const ENSEMBLE_SCHEMA: &str = include_str!("../schema/ensemble.schema.json");

/// Compile the embedded ensemble schema.
pub(crate) fn ensemble_validator() -> Result<Validator> {
    let schema: Value = serde_json::from_str(ENSEMBLE_SCHEMA)
        .map_err(|err| ConfigError::CompileFailed(err.to_string()))?;
    jsonschema::validator_for(&schema).map_err(|err| ConfigError::CompileFailed(err.to_string()))
}

/// Validate a document, joining up to `max_messages` violations.
pub(crate) fn validate_document(
    document: &Value,
    validator: &Validator,
    max_messages: usize,
) -> Result<()> {
    let mut errors = validator.iter_errors(document);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(max_messages.saturating_sub(1)) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(ConfigError::SchemaViolation(message));
    }

    Ok(())
}

/// The embedded ensemble schema text.
pub fn ensemble_schema() -> &'static str {
    ENSEMBLE_SCHEMA
}
