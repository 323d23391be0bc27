//! PATCH request body handling.
//!
//! The `Content-Type` header selects the patch dialect:
//!
//! | Media type | Dialect |
//! |------------|---------|
//! | `application/json-patch+json` | RFC 6902 JSON-Patch |
//! | `application/merge-patch+json` | RFC 7386 JSON-Merge-Patch |
//!
//! Anything else is rejected with 415 before the body is read.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde::{de::DeserializeOwned, Serialize};

use terrograph::patch::{apply_merge_patch, apply_patch};

use crate::error::AppError;

/// Media type for RFC 6902 JSON-Patch bodies.
pub const JSON_PATCH: &str = "application/json-patch+json";
/// Media type for RFC 7386 JSON-Merge-Patch bodies.
pub const MERGE_PATCH: &str = "application/merge-patch+json";

/// A parsed PATCH request body in either supported dialect.
#[derive(Debug)]
pub enum PatchDocument {
    Patch(json_patch::Patch),
    Merge(serde_json::Value),
}

impl PatchDocument {
    /// Apply this document to `entity`, returning the patched copy.
    pub fn apply<T>(&self, entity: &T) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
    {
        match self {
            PatchDocument::Patch(patch) => apply_patch(entity, patch).map_err(Into::into),
            PatchDocument::Merge(merge) => apply_merge_patch(entity, merge).map_err(Into::into),
        }
    }
}

impl<S> FromRequest<S> for PatchDocument
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let media_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            JSON_PATCH => {
                let bytes = read_body(req, state).await?;
                serde_json::from_slice(&bytes)
                    .map(PatchDocument::Patch)
                    .map_err(|e| AppError::InvalidJson(format!("invalid JSON-Patch body: {e}")))
            }
            MERGE_PATCH => {
                let bytes = read_body(req, state).await?;
                serde_json::from_slice(&bytes)
                    .map(PatchDocument::Merge)
                    .map_err(|e| {
                        AppError::InvalidJson(format!("invalid JSON-Merge-Patch body: {e}"))
                    })
            }
            other => Err(AppError::UnsupportedMediaType(format!(
                "PATCH requires Content-Type {JSON_PATCH} or {MERGE_PATCH}, got {other:?}"
            ))),
        }
    }
}

async fn read_body<S: Send + Sync>(req: Request, state: &S) -> Result<Bytes, AppError> {
    Bytes::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(format!("could not read request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde_json::json;

    async fn extract(content_type: &str, body: serde_json::Value) -> Result<PatchDocument, AppError> {
        let req = HttpRequest::builder()
            .method("PATCH")
            .uri("/")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        PatchDocument::from_request(req, &()).await
    }

    #[tokio::test]
    async fn json_patch_media_type_parses_operations() {
        let doc = extract(
            JSON_PATCH,
            json!([{ "op": "replace", "path": "/a", "value": 1 }]),
        )
        .await
        .unwrap();
        assert!(matches!(doc, PatchDocument::Patch(_)));
    }

    #[tokio::test]
    async fn merge_patch_media_type_parses_any_object() {
        let doc = extract(MERGE_PATCH, json!({ "a": null })).await.unwrap();
        assert!(matches!(doc, PatchDocument::Merge(_)));
    }

    #[tokio::test]
    async fn media_type_parameters_are_ignored() {
        let doc = extract(
            "application/merge-patch+json; charset=utf-8",
            json!({ "a": 1 }),
        )
        .await
        .unwrap();
        assert!(matches!(doc, PatchDocument::Merge(_)));
    }

    #[tokio::test]
    async fn plain_json_is_unsupported() {
        let err = extract("application/json", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn malformed_patch_body_is_invalid_json() {
        let err = extract(JSON_PATCH, json!({ "not": "an array" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidJson(_)));
    }
}
