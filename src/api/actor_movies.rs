//! Movies reached from an actor: `/actors/{id}/movies`.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery, WhereQuery};
use super::types::{CountDto, LinkDto, MovieDto, MovieInput};
use super::validation::{Mode, ensure_valid, validate_movie};
use super::{ApiError, ApiResponse, AppState};
use crate::db::RepoError;
use crate::db::repositories::crud::Resource;
use crate::entities::prelude::Actors;

async fn ensure_actor_exists(state: &AppState, actor_id: &str) -> Result<(), ApiError> {
    if state.store.actors().crud().exists(actor_id).await? {
        Ok(())
    } else {
        Err(RepoError::not_found(Actors::NAME, actor_id).into())
    }
}

pub async fn list_actor_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<MovieDto>>>, ApiError> {
    let filter = query.parse()?;
    ensure_actor_exists(&state, &id).await?;

    let movies = state.store.actors().movies(&id).find(&filter).await?;

    Ok(Json(ApiResponse::success(
        movies.into_iter().map(MovieDto::from).collect(),
        "Actor movies have been fetched",
    )))
}

/// Creates a movie already linked to the actor.
pub async fn create_actor_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(mut payload): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<MovieDto>>, ApiError> {
    payload.actor_ids = None;
    ensure_valid(validate_movie(&payload, Mode::Create))?;

    let movie = state
        .store
        .actors()
        .movies(&id)
        .create(payload.into_active_model())
        .await?;

    Ok(Json(ApiResponse::success(
        MovieDto::from(movie),
        "Movie has been created",
    )))
}

pub async fn patch_actor_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
    ApiJson(mut payload): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    payload.actor_ids = None;
    ensure_valid(validate_movie(&payload, Mode::Patch))?;
    let where_clause = query.parse()?;
    ensure_actor_exists(&state, &id).await?;

    let count = state
        .store
        .actors()
        .movies(&id)
        .patch(payload.into_active_model(), where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} movie(s) have been updated"),
    )))
}

/// Deletes the actor's movies matching `where`, with their links.
pub async fn delete_actor_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    let where_clause = query.parse()?;
    ensure_actor_exists(&state, &id).await?;

    let count = state
        .store
        .actors()
        .movies(&id)
        .delete(where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} movie(s) have been deleted"),
    )))
}

/// PUT /actors/{id}/movies/{movie_id}
pub async fn link_actor_movie(
    State(state): State<Arc<AppState>>,
    Path((id, movie_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<LinkDto>>, ApiError> {
    let linked = state.store.actors().movies(&id).link(&movie_id).await?;

    let message = if linked {
        "Movie has been linked"
    } else {
        "Movie was already linked"
    };

    Ok(Json(ApiResponse::success(LinkDto { linked }, message)))
}

/// DELETE /actors/{id}/movies/{movie_id}
pub async fn unlink_actor_movie(
    State(state): State<Arc<AppState>>,
    Path((id, movie_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<LinkDto>>, ApiError> {
    if !state.store.actors().movies(&id).unlink(&movie_id).await? {
        return Err(ApiError::NotFound(format!(
            "Actor {id} is not linked to movie {movie_id}"
        )));
    }

    Ok(Json(ApiResponse::success(
        LinkDto { linked: false },
        "Movie has been unlinked",
    )))
}
