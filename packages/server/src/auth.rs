//! Bearer-token authentication.
//!
//! Accounts authenticate with a name and password (bcrypt-hashed at rest)
//! and receive an HS256 JWT. Domain endpoints require the token via the
//! [`CurrentUser`] extractor, which verifies the signature and expiry and
//! checks that the claims carry the `user` role.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use terrograph::types::{Role, User};

use crate::{error::AppError, handlers::AppState};

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// The claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Account name.
    pub sub: String,
    /// Roles granted at issue time.
    pub roles: Vec<Role>,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// `true` if the claims carry `role`, with `admin` accepted wherever
    /// `user` is required.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role) || (role == Role::User && self.roles.contains(&Role::Admin))
    }
}

// ---------------------------------------------------------------------------
// TokenService
// ---------------------------------------------------------------------------

/// Issues and verifies HS256 bearer tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Seconds an issued token stays valid.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `user`, valid for the configured TTL.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.name.clone(),
            roles: user.roles.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, String> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Constant-time-ish check of a password against its stored hash.
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// CurrentUser extractor
// ---------------------------------------------------------------------------

/// Axum extractor that requires a valid bearer token with the `user` role.
///
/// Returns 401 when the `Authorization` header is absent, malformed, or the
/// token does not verify; 403 when the token verifies but lacks the role.
pub struct CurrentUser {
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move {
            let claims = authenticate(parts, &app_state.tokens)?;
            if !claims.has_role(Role::User) {
                return Err(AppError::Forbidden(
                    "the user role is required for this endpoint".into(),
                ));
            }
            Ok(CurrentUser { claims })
        }
    }
}

/// Extract and verify the bearer token from request parts.
fn authenticate(parts: &Parts, tokens: &Arc<TokenService>) -> Result<Claims, AppError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must be a Bearer token".into()))?;

    tokens
        .verify(token)
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use terrograph::types::new_id;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-that-is-at-least-32-characters-long", 3600)
    }

    fn user(roles: Vec<Role>) -> User {
        User {
            id: new_id(),
            name: "analyst7".into(),
            email: "analyst7@example.com".into(),
            password_hash: "unused".into(),
            roles,
        }
    }

    #[test]
    fn issued_token_verifies_and_carries_roles() {
        let service = service();
        let token = service.issue(&user(vec![Role::User])).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "analyst7");
        assert!(claims.has_role(Role::User));
        assert!(!claims.has_role(Role::Admin));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn admin_claims_satisfy_user_role() {
        let service = service();
        let token = service.issue(&user(vec![Role::Admin])).unwrap();
        let claims = service.verify(&token).unwrap();
        assert!(claims.has_role(Role::User));
    }

    #[test]
    fn token_from_a_different_secret_is_rejected() {
        let token = service().issue(&user(vec![Role::User])).unwrap();
        let other = TokenService::new("another-secret-that-is-also-32-characters!!", 3600);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(service().verify("not.a.token").is_err());
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("s3cret-enough").unwrap();
        assert!(verify_password("s3cret-enough", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-enough", "not-a-bcrypt-hash"));
    }
}
