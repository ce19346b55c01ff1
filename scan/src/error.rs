//! Error types for elnok scans.

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to open point-in-time on {target}: {payload}")]
    LeaseRequestFailed { target: String, payload: QueryError },

    #[error("Search query failed: {0}")]
    BackendQuery(QueryError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Fields named by the caller that the index does not have.
    #[error("These fields do not exist: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostic payload reported by the backend instead of results.
///
/// Kept exactly as received, so callers can present it however they like.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryError {
    pub payload: Map<String, Value>,
}

impl QueryError {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// Build from the `error` section of a response document.
    ///
    /// The backend sometimes reports a bare string rather than an object.
    pub fn from_section(section: Option<&Value>) -> Self {
        match section {
            Some(Value::Object(map)) => Self::new(map.clone()),
            Some(Value::String(reason)) => {
                let mut map = Map::new();
                map.insert("reason".to_string(), Value::String(reason.clone()));
                Self::new(map)
            }
            Some(other) => {
                let mut map = Map::new();
                map.insert("reason".to_string(), other.clone());
                Self::new(map)
            }
            None => Self::default(),
        }
    }

    /// Value of the `type` diagnostic, if the backend gave one.
    pub fn error_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// One `field: value` line per diagnostic entry.
    pub fn lines(&self) -> Vec<String> {
        self.payload
            .iter()
            .map(|(field, value)| match value {
                Value::String(s) => format!("{}: {}", field, s),
                other => format!("{}: {}", field, other),
            })
            .collect()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            return write!(f, "no diagnostic given");
        }
        if let Some(reason) = self.payload.get("reason").and_then(Value::as_str) {
            return match self.error_type() {
                Some(kind) => write!(f, "{} ({})", reason, kind),
                None => write!(f, "{}", reason),
            };
        }
        write!(f, "{}", Value::Object(self.payload.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_error_from_object() {
        let section = json!({"type": "parse_exception", "reason": "failed to parse date"});
        let err = QueryError::from_section(Some(&section));
        assert_eq!(err.error_type(), Some("parse_exception"));
        assert_eq!(err.to_string(), "failed to parse date (parse_exception)");
    }

    #[test]
    fn test_query_error_from_string() {
        let section = json!("index_not_found");
        let err = QueryError::from_section(Some(&section));
        assert_eq!(err.payload.get("reason"), Some(&json!("index_not_found")));
        assert_eq!(err.error_type(), None);
    }

    #[test]
    fn test_query_error_missing_section() {
        let err = QueryError::from_section(None);
        assert!(err.payload.is_empty());
        assert_eq!(err.to_string(), "no diagnostic given");
    }

    #[test]
    fn test_query_error_lines_keep_order() {
        let section = json!({"type": "x", "reason": "y", "status": 400});
        let err = QueryError::from_section(Some(&section));
        assert_eq!(err.lines(), vec!["type: x", "reason: y", "status: 400"]);
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("duplicate match on field level".into());
        assert_eq!(err.to_string(), "Configuration error: duplicate match on field level");
    }

    #[test]
    fn test_unknown_fields_display() {
        let err = Error::UnknownFields(vec!["levle".into(), "mesage".into()]);
        assert_eq!(err.to_string(), "These fields do not exist: levle, mesage");
    }
}
