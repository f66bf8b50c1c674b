//! Request validation utilities.

use crate::types::{Error, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Validate that a duration is non-zero.
pub fn validate_positive_duration(d: Duration, field: &str) -> Result<()> {
    if d.is_zero() {
        return Err(Error::validation(format!("{} must be positive", field)));
    }
    Ok(())
}

/// Required string field from a JSON body.
pub fn require_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(Error::validation(format!("{} cannot be empty", field))),
        Some(_) => Err(Error::validation(format!("{} must be a string", field))),
        None => Err(Error::validation(format!("{} is required", field))),
    }
}

/// Optional string field; present-but-wrong-type is still an error.
pub fn optional_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Error::validation(format!("{} must be a string", field))),
    }
}

/// Optional object field, defaulting to empty.
pub fn optional_object(body: &Map<String, Value>, field: &str) -> Result<Map<String, Value>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::validation(format!("{} must be an object", field))),
    }
}
