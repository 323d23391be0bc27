//! Account registration and authentication types.

use serde::{Deserialize, Serialize};

use terrograph::validation::{ConstraintViolations, Validate, Violations};

/// Shortest accepted account name.
pub const MIN_NAME_LEN: usize = 5;
/// Longest accepted account name.
pub const MAX_NAME_LEN: usize = 20;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 7;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/registration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Confirmation; must equal `password`.
    #[serde(default)]
    pub match_password: Option<String>,
}

impl Validate for RegistrationRequest {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();

        match &self.name {
            None => v.add("name", "is required"),
            Some(name) => {
                let len = name.chars().count();
                v.check(
                    !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len),
                    "name",
                    "must be between 5 and 20 characters",
                );
            }
        }

        match &self.email {
            None => v.add("email", "is required"),
            Some(email) => v.check(
                !terrograph::validation::is_valid_email(email),
                "email",
                "must be a valid email address",
            ),
        }

        match &self.password {
            None => v.add("password", "is required"),
            Some(password) => {
                v.check(
                    password.chars().count() < MIN_PASSWORD_LEN,
                    "password",
                    "must be at least 7 characters",
                );
                if let Some(name) = &self.name {
                    v.check(
                        !name.is_empty() && password.to_lowercase().contains(&name.to_lowercase()),
                        "password",
                        "must not contain the account name",
                    );
                }
            }
        }

        match (&self.password, &self.match_password) {
            (_, None) => v.add("match_password", "is required"),
            (Some(p), Some(m)) => v.check(p != m, "match_password", "must match password"),
            (None, Some(_)) => {}
        }

        v.finish()
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/authentication`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthenticationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Validate for AuthenticationRequest {
    fn validate(&self) -> Result<(), ConstraintViolations> {
        let mut v = Violations::new();
        v.check(
            self.name.as_deref().is_none_or(str::is_empty),
            "name",
            "is required",
        );
        v.check(
            self.password.as_deref().is_none_or(str::is_empty),
            "password",
            "is required",
        );
        v.finish()
    }
}

/// Response body for both auth endpoints.
///
/// ```json
/// { "token": "eyJhbGciOiJIUzI1NiJ9...", "token_type": "Bearer", "expires_in": 3600 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".into(),
            expires_in,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegistrationRequest {
        RegistrationRequest {
            name: Some("analyst7".into()),
            email: Some("analyst7@example.com".into()),
            password: Some("s3cret-enough".into()),
            match_password: Some("s3cret-enough".into()),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn name_length_bounds() {
        let mut r = registration();
        r.name = Some("abcd".into());
        assert_eq!(r.validate().unwrap_err().0[0].field, "name");

        r.name = Some("a".repeat(21));
        assert_eq!(r.validate().unwrap_err().0[0].field, "name");
    }

    #[test]
    fn password_must_not_contain_name() {
        let mut r = registration();
        r.password = Some("xxAnalyst7yy".into());
        r.match_password = r.password.clone();
        let err = r.validate().unwrap_err();
        assert!(err.0.iter().any(|v| v.field == "password"));
    }

    #[test]
    fn mismatch_is_reported_alongside_other_violations() {
        let r = RegistrationRequest {
            name: Some("ok-name".into()),
            email: Some("bad-email".into()),
            password: Some("short".into()),
            match_password: Some("different".into()),
        };
        let err = r.validate().unwrap_err();
        let fields: Vec<&str> = err.0.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
        assert!(fields.contains(&"match_password"));
    }

    #[test]
    fn authentication_requires_both_fields() {
        let err = AuthenticationRequest::default().validate().unwrap_err();
        assert_eq!(err.0.len(), 2);
    }

    #[test]
    fn token_response_shape() {
        let t = TokenResponse::bearer("abc", 3600);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
    }
}
