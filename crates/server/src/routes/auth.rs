use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use service::auth::domain::{LoginRequest, LoginResponse, RemoteUser};
use tracing::{info, warn};

use crate::accounts::AccountDirectory;
use crate::errors::ApiError;
use crate::tokens::TokenIssuer;

#[derive(Clone)]
pub struct ServerState {
    pub accounts: Arc<AccountDirectory>,
    pub tokens: TokenIssuer,
}

/// `POST /auth/login`: verify identifier/secret and issue a token.
pub async fn login(State(state): State<ServerState>, Json(input): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    if input.identifier.trim().is_empty() || input.secret.is_empty() {
        return Err(ApiError::BadRequest("identifier and secret are required".into()));
    }
    let account = state
        .accounts
        .verify(&input.identifier, &input.secret)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| {
            warn!(identifier = %input.identifier, "login rejected");
            ApiError::Unauthorized
        })?;
    let token = state.tokens.issue(&account)?;
    info!(account_id = %account.id, role = %account.role, "login accepted");
    Ok(Json(LoginResponse {
        token,
        user: RemoteUser { id: account.id, role: account.role.to_string(), display_name: account.display_name },
    }))
}

/// `GET /auth/session`: identity behind a bearer token, if the token and the
/// account are both still valid.
pub async fn session(State(state): State<ServerState>, headers: HeaderMap) -> Result<Json<RemoteUser>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::InvalidToken)?;
    let claims = state.tokens.validate(token)?;
    let account = state.accounts.find(&claims.idn).await.ok_or(ApiError::InvalidToken)?;
    if account.id != claims.sub {
        return Err(ApiError::InvalidToken);
    }
    Ok(Json(RemoteUser { id: account.id, role: account.role.to_string(), display_name: account.display_name }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
