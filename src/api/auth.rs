use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::extract::ApiJson;
use super::types::{SigninRequest, SignupRequest, UserDto};
use super::validation::{ensure_valid, validate_signup};
use super::{ApiError, ApiResponse, AppState};
use crate::services::{Identity, NewUser, SignInResult};

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <jwt>`. On success the verified [`Identity`]
/// is placed in the request extensions and its id recorded on the request span.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing or malformed Authorization header"))?;

    let identity = state
        .tokens
        .verify(token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    tracing::Span::current().record("user_id", identity.user_id.as_str());
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /signup
/// Accounts are created inactive; an admin activates them.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    ensure_valid(validate_signup(
        &payload,
        state.config.security.password_min_length,
    ))?;

    let user = state
        .auth
        .signup(NewUser {
            first_name: payload.first_name.unwrap_or_default().trim().to_string(),
            last_name: payload.last_name.unwrap_or_default().trim().to_string(),
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
        })
        .await?;

    Ok(Json(ApiResponse::success(
        UserDto::from(user),
        "User has been registered",
    )))
}

/// POST /signin
pub async fn signin(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SigninRequest>,
) -> Result<Json<ApiResponse<SignInResult>>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Invalid fields: email and password are required"));
    }

    let result = state.auth.signin(&payload.email, &payload.password).await?;

    Ok(Json(ApiResponse::success(result, "User credential is valid")))
}

/// GET /whoami
pub async fn whoami(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.auth.identity(&identity.user_id).await?;

    Ok(Json(ApiResponse::success(UserDto::from(user), "User found")))
}
