use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery, WhereQuery};
use super::reviews::review_changes;
use super::types::{CountDto, MovieDto, MovieInput, NoData, ReviewDto, ReviewInput};
use super::validation::{Mode, ensure_valid, validate_movie, validate_review, validate_search_query};
use super::{ApiError, ApiResponse, AppState};
use crate::db::repositories::crud::Resource;
use crate::db::{Filter, RepoError};
use crate::entities::prelude::Movies;
use crate::services::Identity;

pub(super) async fn ensure_movie_exists(state: &AppState, movie_id: &str) -> Result<(), ApiError> {
    if state.store.movies().crud().exists(movie_id).await? {
        Ok(())
    } else {
        Err(RepoError::not_found(Movies::NAME, movie_id).into())
    }
}

/// POST /movie
/// `actorIds`, when given, becomes the movie's linked actor set.
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    ApiJson(mut payload): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<MovieDto>>, ApiError> {
    ensure_valid(validate_movie(&payload, Mode::Create))?;

    let actor_ids = payload.actor_ids.take();

    let movies = state.store.movies();
    let movie = movies
        .create_with_actors(payload.into_active_model(), actor_ids.as_deref())
        .await?;

    let created = movies.find_by_id(&movie.id, &Filter::default()).await?;

    tracing::info!(movie_id = %movie.id, actors = created.actor_ids.len(), "Movie created");

    Ok(Json(ApiResponse::success(
        MovieDto::from(created),
        "Movie has been created",
    )))
}

/// GET /movie and GET /movies
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<MovieDto>>>, ApiError> {
    let filter = query.parse()?;
    let movies = state.store.movies().find(&filter).await?;

    Ok(Json(ApiResponse::success(
        movies.into_iter().map(MovieDto::from).collect(),
        "All movies have been fetched",
    )))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<MovieDto>>, ApiError> {
    let filter = query.parse()?;
    let movie = state.store.movies().find_by_id(&id, &filter).await?;

    Ok(Json(ApiResponse::success(
        MovieDto::from(movie),
        "Movie has been fetched",
    )))
}

/// GET /movie/search/{title}
pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> Result<Json<ApiResponse<Vec<MovieDto>>>, ApiError> {
    let prefix = validate_search_query(&title)?;
    let movies = state.store.movies().search_by_title(prefix).await?;

    let message = if movies.is_empty() {
        format!("No movies found matching '{prefix}'")
    } else {
        format!("Found {} movie(s)", movies.len())
    };

    Ok(Json(ApiResponse::success(
        movies.into_iter().map(MovieDto::from).collect(),
        message,
    )))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(mut payload): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<MovieDto>>, ApiError> {
    ensure_valid(validate_movie(&payload, Mode::Patch))?;

    let actor_ids = payload.actor_ids.take();

    let movies = state.store.movies();
    movies
        .update_with_actors(&id, payload.into_active_model(), actor_ids.as_deref())
        .await?;

    let updated = movies.find_by_id(&id, &Filter::default()).await?;

    Ok(Json(ApiResponse::success(
        MovieDto::from(updated),
        "Movie has been updated",
    )))
}

/// Removes the movie together with its reviews and actor links.
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NoData>>, ApiError> {
    state.store.movies().delete_by_id(&id).await?;

    tracing::info!(movie_id = %id, "Movie deleted");

    Ok(Json(ApiResponse::empty("Movie has been deleted")))
}

// ============================================================================
// Reviews of a movie
// ============================================================================

pub async fn list_movie_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    let filter = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let reviews = state.store.movies().reviews(&id).find(&filter).await?;

    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(ReviewDto::from).collect(),
        "Movie reviews have been fetched",
    )))
}

pub async fn create_movie_review(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewInput>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    ensure_valid(validate_review(&payload, Mode::Create, false))?;

    let review = state
        .store
        .reviews()
        .create(&id, &identity.user_id, payload.into_active_model())
        .await?;

    Ok(Json(ApiResponse::success(
        ReviewDto::from(review),
        "Review has been submitted",
    )))
}

/// PATCH /movie/{id}/reviews?where=
/// Moderation tool: bulk status or content changes on a movie's reviews.
pub async fn patch_movie_reviews(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
    ApiJson(payload): ApiJson<ReviewInput>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    if !identity.is_moderator() {
        return Err(ApiError::forbidden("Only moderators can bulk edit reviews"));
    }
    ensure_valid(validate_review(&payload, Mode::Patch, false))?;
    let where_clause = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let count = state
        .store
        .movies()
        .reviews(&id)
        .patch(review_changes(payload)?, where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} review(s) have been updated"),
    )))
}

pub async fn delete_movie_reviews(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    if !identity.is_moderator() {
        return Err(ApiError::forbidden("Only moderators can bulk delete reviews"));
    }
    let where_clause = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let count = state
        .store
        .movies()
        .reviews(&id)
        .delete(where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} review(s) have been deleted"),
    )))
}
