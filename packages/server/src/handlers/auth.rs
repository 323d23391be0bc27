//! Account registration and authentication endpoints.
//!
//! - `POST /api/v1/registration`: create an account, returns a token (201).
//! - `POST /api/v1/authentication`: exchange credentials for a token (200).
//!
//! These are the only two endpoints that do not require a bearer token.
//! Failed logins always answer with the same message whether the name or
//! the password was wrong.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use terrograph::types::{new_id, Role, User};
use terrograph::validation::Validate;
use terrograph_api::auth::{AuthenticationRequest, RegistrationRequest, TokenResponse};

use crate::auth::{hash_password, verify_password};
use crate::error::AppError;

use super::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let (Some(name), Some(email), Some(password)) = (req.name, req.email, req.password) else {
        return Err(AppError::Internal(
            "registration fields missing after validation".into(),
        ));
    };

    let user = User {
        id: new_id(),
        name,
        email,
        password_hash: hash_password(&password)?,
        roles: vec![Role::User],
    };
    state.storage.put_user(&user).await?;

    let token = state.tokens.issue(&user)?;
    tracing::info!("registered account {:?}", user.name);
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::bearer(token, state.tokens.ttl_secs())),
    ))
}

pub async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthenticationRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    req.validate()?;
    let (Some(name), Some(password)) = (req.name, req.password) else {
        return Err(AppError::Internal(
            "authentication fields missing after validation".into(),
        ));
    };

    let user = state
        .storage
        .get_user_by_name(&name)
        .await?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid name or password".into()))?;

    let token = state.tokens.issue(&user)?;
    Ok(Json(TokenResponse::bearer(token, state.tokens.ttl_secs())))
}
