//! Constraint validation machinery.
//!
//! Write representations (DTOs in `terrograph-api`) implement [`Validate`].
//! Unlike a first-error check, validation here is aggregating: every
//! violation found is collected into one [`ConstraintViolations`] value so a
//! single 422 response can report the complete list. Nested DTOs contribute
//! violations under a dotted field path (e.g. `target.country_of_origin.name`).

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// One failed constraint on one field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Dotted path of the offending field (e.g. `city.latitude`).
    pub field: String,
    /// Human-readable description of the constraint that failed.
    pub message: String,
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The aggregate of every violation found in one validation pass.
///
/// Always non-empty: a passing validation returns `Ok(())` instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed with {} violation(s)", .0.len())]
pub struct ConstraintViolations(pub Vec<ConstraintViolation>);

impl ConstraintViolations {
    /// Render each violation as `field: message`, in the order found.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|v| v.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates violations during a validation pass.
#[derive(Debug, Default)]
pub struct Violations {
    found: Vec<ConstraintViolation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation on `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.found.push(ConstraintViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record a violation when `failed` is true.
    pub fn check(&mut self, failed: bool, field: &str, message: &str) {
        if failed {
            self.add(field, message);
        }
    }

    /// Run a nested value's validation, re-prefixing its field paths with
    /// `prefix.`.
    pub fn nested<V: Validate>(&mut self, prefix: &str, value: &V) {
        if let Err(ConstraintViolations(inner)) = value.validate() {
            for v in inner {
                self.found.push(ConstraintViolation {
                    field: format!("{prefix}.{}", v.field),
                    message: v.message,
                });
            }
        }
    }

    /// `Ok(())` when nothing was recorded, the full aggregate otherwise.
    pub fn finish(self) -> Result<(), ConstraintViolations> {
        if self.found.is_empty() {
            Ok(())
        } else {
            Err(ConstraintViolations(self.found))
        }
    }
}

/// Implemented by every validation-bearing write representation.
pub trait Validate {
    /// Validate the whole value, aggregating every violation found.
    fn validate(&self) -> Result<(), ConstraintViolations>;
}

// ---------------------------------------------------------------------------
// Shared field checks
// ---------------------------------------------------------------------------

/// Loose email shape check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Inner {
        name: String,
    }

    impl Validate for Inner {
        fn validate(&self) -> Result<(), ConstraintViolations> {
            let mut v = Violations::new();
            v.check(self.name.is_empty(), "name", "must not be empty");
            v.finish()
        }
    }

    struct Outer {
        label: String,
        inner: Inner,
    }

    impl Validate for Outer {
        fn validate(&self) -> Result<(), ConstraintViolations> {
            let mut v = Violations::new();
            v.check(self.label.is_empty(), "label", "must not be empty");
            v.nested("inner", &self.inner);
            v.finish()
        }
    }

    #[test]
    fn empty_collector_passes() {
        assert_eq!(Violations::new().finish(), Ok(()));
    }

    #[test]
    fn violations_aggregate_instead_of_short_circuiting() {
        let outer = Outer {
            label: String::new(),
            inner: Inner { name: String::new() },
        };
        let err = outer.validate().unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert_eq!(
            err.messages(),
            vec!["label: must not be empty", "inner.name: must not be empty"]
        );
    }

    #[test]
    fn nested_paths_are_prefixed() {
        let outer = Outer {
            label: "ok".into(),
            inner: Inner { name: String::new() },
        };
        let err = outer.validate().unwrap_err();
        assert_eq!(err.0[0].field, "inner.name");
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("analyst@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
