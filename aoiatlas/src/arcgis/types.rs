//! Query client types and errors

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while querying a feature layer.
#[derive(Debug, Clone, Error)]
pub enum ArcGisError {
    /// Network-level failure (connect error, timeout, HTTP status).
    ///
    /// `retriable` distinguishes transient conditions (rate limiting,
    /// server-side 5xx, timeouts) from hard failures such as a 404.
    #[error("transport error: {message}")]
    Transport { message: String, retriable: bool },

    /// The service answered with HTTP success but embedded an error
    /// payload, which indicates a malformed query rather than transient
    /// unavailability. Never retried.
    #[error("service error: {0}")]
    Service(String),

    /// The response body could not be decoded as a feature set.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ArcGisError {
    /// Creates a retriable transport error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retriable: true,
        }
    }

    /// Creates a non-retriable transport error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retriable: false,
        }
    }

    /// Whether the retry policy may re-issue the request.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                retriable: true,
                ..
            }
        )
    }
}

/// A single record returned by a feature-layer query.
///
/// `geometry` keeps the service's native encoding (`rings`, `paths` or
/// `x`/`y`); conversion to the standard form is the [`crate::geo`]
/// adapter's job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
}

impl Feature {
    /// Returns an attribute as `f64`, accepting numbers and numeric strings.
    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns an attribute as `i64`, accepting integers and numeric strings.
    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns an attribute rendered as a string (strings and numbers).
    pub fn attr_string(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Wire format of a feature-layer query response.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Page-truncation flag: more features remain past the current offset.
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: bool,
    /// Service-level error payload carried inside an HTTP 200.
    #[serde(default)]
    pub error: Option<Value>,
}

/// Optional overrides for a layer query.
///
/// Unset fields fall back to the client defaults: unrestricted predicate,
/// all output fields, geometry returned, page size 2000.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub where_clause: Option<String>,
    pub out_fields: Option<String>,
    pub return_geometry: Option<bool>,
    pub page_size: Option<u32>,
    /// Extra form parameters appended verbatim (spatial filters, ordering).
    pub extra: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attr_f64_accepts_numeric_strings() {
        let feature: Feature =
            serde_json::from_value(json!({"attributes": {"a": 2.5, "b": " 3.5", "c": "x"}}))
                .unwrap();
        assert_eq!(feature.attr_f64("a"), Some(2.5));
        assert_eq!(feature.attr_f64("b"), Some(3.5));
        assert_eq!(feature.attr_f64("c"), None);
        assert_eq!(feature.attr_f64("missing"), None);
    }

    #[test]
    fn test_attr_string_renders_numbers() {
        let feature: Feature =
            serde_json::from_value(json!({"attributes": {"code": 16, "name": "Dhalai"}})).unwrap();
        assert_eq!(feature.attr_string("code").as_deref(), Some("16"));
        assert_eq!(feature.attr_string("name").as_deref(), Some("Dhalai"));
    }

    #[test]
    fn test_response_error_payload_deserializes() {
        let body = json!({"error": {"code": 400, "message": "Invalid query"}});
        let response: QueryResponse = serde_json::from_value(body).unwrap();
        assert!(response.error.is_some());
        assert!(response.features.is_empty());
        assert!(!response.exceeded_transfer_limit);
    }
}
