use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery};
use super::types::{NoData, ReviewDto, UserDto, UserPatch};
use super::validation::{ensure_valid, validate_user_patch};
use super::{ApiError, ApiResponse, AppState};
use crate::services::Identity;

fn require_manage(identity: &Identity, user_id: &str) -> Result<(), ApiError> {
    if identity.can_manage(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only manage your own account"))
    }
}

/// GET /users/list
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let filter = query.parse()?;
    let users = state.store.users().find(&filter).await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
        "All users have been fetched",
    )))
}

/// GET /users/{id}/reviews
pub async fn list_user_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    let filter = query.parse()?;
    let users = state.store.users();
    users.find_by_id(&id).await?;

    let reviews = users.reviews(&id).find(&filter).await?;

    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(ReviewDto::from).collect(),
        "User reviews have been fetched",
    )))
}

/// PATCH /user/{id}
/// `role` and `isActive` are admin-only.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UserPatch>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_manage(&identity, &id)?;
    if payload.touches_privileges() && !identity.is_admin() {
        return Err(ApiError::forbidden("Only admins can change role or activation"));
    }
    ensure_valid(validate_user_patch(&payload))?;

    let users = state.store.users();
    users.find_by_id(&id).await?;

    if let Some(email) = &payload.email {
        let email = email.trim().to_lowercase();
        if let Some(owner) = users.find_by_email(&email).await?
            && owner.id != id
        {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }
    }

    let user = users.update_by_id(&id, payload.into_active_model()).await?;

    tracing::info!(user_id = %id, actor = %identity.user_id, "User updated");

    Ok(Json(ApiResponse::success(
        UserDto::from(user),
        "User has been updated",
    )))
}

/// DELETE /user/{id}
/// Removes the account with its credentials and reviews.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NoData>>, ApiError> {
    require_manage(&identity, &id)?;

    state.store.users().delete_by_id(&id).await?;

    tracing::info!(user_id = %id, actor = %identity.user_id, "User deleted");

    Ok(Json(ApiResponse::empty("User has been deleted")))
}
