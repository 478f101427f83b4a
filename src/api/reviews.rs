use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use sea_orm::ActiveValue::Set;
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery};
use super::types::{NoData, ReviewDto, ReviewInput, UserDto};
use super::validation::{Mode, ensure_valid, validate_review};
use super::{ApiError, ApiResponse, AppState};
use crate::db::repositories::review::ReviewStatus;
use crate::entities::reviews;
use crate::services::Identity;

/// Score, description and, when present, status of a review update.
pub(super) fn review_changes(payload: ReviewInput) -> Result<reviews::ActiveModel, ApiError> {
    let status = payload
        .status
        .as_deref()
        .map(str::parse::<ReviewStatus>)
        .transpose()
        .map_err(ApiError::validation)?;

    let mut changes = payload.into_active_model();
    if let Some(status) = status {
        changes.status = Set(status.to_string());
    }
    Ok(changes)
}

fn require_moderator(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_moderator() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only moderators can change review status"))
    }
}

/// POST /review
/// The author is the caller; `movieId` comes from the body.
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<ReviewInput>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    ensure_valid(validate_review(&payload, Mode::Create, true))?;

    let movie_id = payload.movie_id.clone().unwrap_or_default();
    let review = state
        .store
        .reviews()
        .create(movie_id.trim(), &identity.user_id, payload.into_active_model())
        .await?;

    tracing::info!(review_id = %review.id, movie_id = %review.movie_id, "Review submitted");

    Ok(Json(ApiResponse::success(
        ReviewDto::from(review),
        "Review has been submitted",
    )))
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    let filter = query.parse()?;
    let reviews = state.store.reviews().find(&filter).await?;

    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(ReviewDto::from).collect(),
        "All reviews have been fetched",
    )))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let filter = query.parse()?;
    let review = state.store.reviews().find_by_id(&id, &filter).await?;

    Ok(Json(ApiResponse::success(
        ReviewDto::from(review),
        "Review has been fetched",
    )))
}

/// PATCH /review/{id}
/// Authors may edit score and description; only moderators may touch status.
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewInput>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    ensure_valid(validate_review(&payload, Mode::Patch, false))?;

    let repo = state.store.reviews();
    let existing = repo.crud().find_by_id(&id).await?;

    if payload.status.is_some() {
        require_moderator(&identity)?;
    }

    let edits_content = payload.review_score.is_some() || payload.description.is_some();
    if edits_content && existing.user_id != identity.user_id && !identity.is_moderator() {
        return Err(ApiError::forbidden("Only the author can edit this review"));
    }

    let review = repo.update_by_id(&id, review_changes(payload)?).await?;

    Ok(Json(ApiResponse::success(
        ReviewDto::from(review),
        "Review has been updated",
    )))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NoData>>, ApiError> {
    let repo = state.store.reviews();
    let existing = repo.crud().find_by_id(&id).await?;

    if existing.user_id != identity.user_id && !identity.is_moderator() {
        return Err(ApiError::forbidden("Only the author can delete this review"));
    }

    repo.delete_by_id(&id).await?;

    Ok(Json(ApiResponse::empty("Review has been deleted")))
}

/// GET /reviews/{id}/user
pub async fn get_review_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.store.reviews().user(&id).await?;

    Ok(Json(ApiResponse::success(
        UserDto::from(user),
        "Review author has been fetched",
    )))
}
