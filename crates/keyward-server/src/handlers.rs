use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use keyward_auth::{AuthError, BearerAuth};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::server::AppState;
use crate::users::{User, UserError};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub jwt: String,
}

/// `POST /auth`: exchange email and password for a bearer token.
pub async fn auth(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let Json(credentials) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected credentials body");
        AuthError::bad_request("request body must be JSON with email and password")
    })?;

    let user = state
        .users
        .authenticate(&credentials.email, &credentials.password)
        .await
        .map_err(user_error)?
        .ok_or_else(|| {
            tracing::debug!(email = %credentials.email, "Rejected credentials");
            AuthError::unauthorized("invalid credentials")
        })?;

    let jwt = state
        .issuer
        .issue_for(&user.email, state.token_lifetime)
        .await?;

    tracing::info!(user_id = user.id, "Issued token");
    Ok(Json(TokenResponse { jwt }))
}

/// `GET /user`: the account named by the bearer token.
pub async fn get_user(
    State(state): State<AppState>,
    BearerAuth(email): BearerAuth,
) -> Result<Json<User>, AuthError> {
    match state.users.find_by_email(&email).await.map_err(user_error)? {
        Some(user) => Ok(Json(user)),
        None => {
            tracing::warn!(email = %email, "Valid token for unknown user");
            Err(AuthError::invalid_token())
        }
    }
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn user_error(err: UserError) -> AuthError {
    tracing::error!(error = %err, "User directory failed");
    AuthError::internal("user directory unavailable")
}
