//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// {
///   "error": "validation failed with 2 violation(s)",
///   "code": "validation_failed",
///   "details": ["summary: is required", "city.latitude: must be between -90 and 90"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_json` | 400 |
    /// | `invalid_parameter` | 400 |
    /// | `unauthorized` | 401 |
    /// | `forbidden` | 403 |
    /// | `not_found` | 404 |
    /// | `id_conflict` | 409 |
    /// | `unsupported_media_type` | 415 |
    /// | `validation_failed` | 422 |
    /// | `internal_error` | 500 |
    pub code: String,

    /// One entry per constraint violation; present only for
    /// `validation_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a static code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
            details: None,
        }
    }

    /// Construct a `validation_failed` response carrying one detail line per
    /// violation.
    pub fn validation(error: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            code: codes::VALIDATION_FAILED.into(),
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Well-known error codes.
pub mod codes {
    pub const INVALID_JSON: &str = "invalid_json";
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const ID_CONFLICT: &str = "id_conflict";
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "unsupported_media_type";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let e = ErrorResponse::new(codes::NOT_FOUND, "event 0195... not found");
        let json = serde_json::to_string(&e).unwrap();
        let back: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn details_omitted_unless_validation() {
        let e = ErrorResponse::new(codes::NOT_FOUND, "nope");
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("details").is_none());

        let e = ErrorResponse::validation("validation failed", vec!["name: is required".into()]);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["details"][0], "name: is required");
    }
}
