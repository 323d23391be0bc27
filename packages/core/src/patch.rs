//! Generic application of standard patch documents to typed entities.
//!
//! Both functions follow the same shape: serialize the entity into a
//! `serde_json::Value`, apply the patch document, and deserialize the result
//! back into the typed entity. The deserialization step is what keeps patched
//! records well-formed: a patch that removes a required field or writes a
//! value of the wrong type fails with [`PatchError::Reshape`] instead of
//! producing a malformed record.
//!
//! Handlers are responsible for post-patch checks that need context this
//! module does not have: id immutability and DTO re-validation.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while applying a patch document.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The entity could not be rendered as a JSON document.
    #[error("entity could not be serialized: {0}")]
    Serialize(String),

    /// The patch document could not be applied (bad path, failed `test`
    /// operation, malformed operation).
    #[error("patch could not be applied: {0}")]
    Apply(String),

    /// The patched document no longer deserializes into the entity type.
    #[error("patched document no longer forms a valid record: {0}")]
    Reshape(String),
}

/// Apply an RFC 6902 JSON-Patch document to `entity`, returning the patched
/// copy.
pub fn apply_patch<T>(entity: &T, patch: &json_patch::Patch) -> Result<T, PatchError>
where
    T: Serialize + DeserializeOwned,
{
    let mut doc = to_document(entity)?;
    json_patch::patch(&mut doc, patch).map_err(|e| PatchError::Apply(e.to_string()))?;
    from_document(doc)
}

/// Apply an RFC 7386 JSON-Merge-Patch document to `entity`, returning the
/// patched copy.
///
/// Per the RFC, a `null` member removes the corresponding field; on an
/// `Option` field that clears the relation, on a required field the removal
/// surfaces as [`PatchError::Reshape`].
pub fn apply_merge_patch<T>(entity: &T, patch: &Value) -> Result<T, PatchError>
where
    T: Serialize + DeserializeOwned,
{
    let mut doc = to_document(entity)?;
    json_patch::merge(&mut doc, patch);
    from_document(doc)
}

fn to_document<T: Serialize>(entity: &T) -> Result<Value, PatchError> {
    serde_json::to_value(entity).map_err(|e| PatchError::Serialize(e.to_string()))
}

fn from_document<T: DeserializeOwned>(doc: Value) -> Result<T, PatchError> {
    serde_json::from_value(doc).map_err(|e| PatchError::Reshape(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, Target, Victim};
    use chrono::NaiveDate;
    use serde_json::json;

    fn event() -> Event {
        Event {
            id: "019526b2-f68a-7c3e-a0b4-1d2e3f4a5b6c".into(),
            summary: "Car bombing outside a government building.".into(),
            motive: "Political".into(),
            date: NaiveDate::from_ymd_opt(2017, 11, 5).unwrap(),
            part_of_multiple_incidents: false,
            successful: true,
            suicidal: false,
            target: Some(Target {
                id: "019526b2-f68a-7c3e-a0b4-1d2e3f4a5b6d".into(),
                name: "Government building".into(),
                country_of_origin: None,
            }),
            city: None,
            victim: Some(Victim {
                id: "019526b2-f68a-7c3e-a0b4-1d2e3f4a5b6e".into(),
                total_fatalities: 3,
                perpetrator_fatalities: 1,
                total_injured: 12,
                perpetrator_injured: 0,
                property_damage: 250_000,
            }),
        }
    }

    fn parse_patch(doc: serde_json::Value) -> json_patch::Patch {
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn json_patch_replaces_scalar_field() {
        let patch = parse_patch(json!([
            { "op": "replace", "path": "/summary", "value": "Updated summary." }
        ]));
        let patched = apply_patch(&event(), &patch).unwrap();
        assert_eq!(patched.summary, "Updated summary.");
        assert_eq!(patched.motive, "Political");
    }

    #[test]
    fn json_patch_reaches_nested_fields() {
        let patch = parse_patch(json!([
            { "op": "replace", "path": "/target/name", "value": "Embassy" },
            { "op": "replace", "path": "/victim/total_injured", "value": 15 }
        ]));
        let patched = apply_patch(&event(), &patch).unwrap();
        assert_eq!(patched.target.unwrap().name, "Embassy");
        assert_eq!(patched.victim.unwrap().total_injured, 15);
    }

    #[test]
    fn json_patch_failed_test_op() {
        let patch = parse_patch(json!([
            { "op": "test", "path": "/motive", "value": "Religious" },
            { "op": "replace", "path": "/motive", "value": "Unknown" }
        ]));
        let err = apply_patch(&event(), &patch).unwrap_err();
        assert!(matches!(err, PatchError::Apply(_)));
    }

    #[test]
    fn json_patch_bad_path() {
        let patch = parse_patch(json!([
            { "op": "replace", "path": "/no_such_field", "value": 1 }
        ]));
        assert!(matches!(
            apply_patch(&event(), &patch),
            Err(PatchError::Apply(_))
        ));
    }

    #[test]
    fn json_patch_removing_required_field_is_a_reshape_error() {
        let patch = parse_patch(json!([
            { "op": "remove", "path": "/date" }
        ]));
        assert!(matches!(
            apply_patch(&event(), &patch),
            Err(PatchError::Reshape(_))
        ));
    }

    #[test]
    fn json_patch_wrong_type_is_a_reshape_error() {
        let patch = parse_patch(json!([
            { "op": "replace", "path": "/successful", "value": "yes" }
        ]));
        assert!(matches!(
            apply_patch(&event(), &patch),
            Err(PatchError::Reshape(_))
        ));
    }

    #[test]
    fn merge_patch_updates_and_preserves() {
        let patch = json!({ "motive": "Unknown", "suicidal": true });
        let patched = apply_merge_patch(&event(), &patch).unwrap();
        assert_eq!(patched.motive, "Unknown");
        assert!(patched.suicidal);
        assert_eq!(patched.summary, event().summary);
        assert!(patched.target.is_some());
    }

    #[test]
    fn merge_patch_null_clears_optional_relation() {
        let patch = json!({ "target": null });
        let patched = apply_merge_patch(&event(), &patch).unwrap();
        assert!(patched.target.is_none());
        assert!(patched.victim.is_some());
    }

    #[test]
    fn merge_patch_null_on_required_field_is_a_reshape_error() {
        let patch = json!({ "summary": null });
        assert!(matches!(
            apply_merge_patch(&event(), &patch),
            Err(PatchError::Reshape(_))
        ));
    }

    #[test]
    fn merge_patch_nested_object_merges_recursively() {
        let patch = json!({ "victim": { "total_fatalities": 4 } });
        let patched = apply_merge_patch(&event(), &patch).unwrap();
        let victim = patched.victim.unwrap();
        assert_eq!(victim.total_fatalities, 4);
        assert_eq!(victim.total_injured, 12);
    }
}
