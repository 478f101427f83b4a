//! Actors reached from a movie: `/movies/{id}/actors` and the bulk forms on
//! `/movie/{id}/actors`.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery, WhereQuery};
use super::movies::ensure_movie_exists;
use super::types::{ActorDto, ActorIdsInput, ActorInput, ActorRef, CountDto, LinkDto, MovieDto};
use super::validation::{Mode, ensure_valid, validate_actor};
use super::{ApiError, ApiResponse, AppState};
use crate::db::Filter;

pub async fn list_movie_actors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<ActorDto>>>, ApiError> {
    let filter = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let actors = state.store.movies().actors(&id).find(&filter).await?;

    Ok(Json(ApiResponse::success(
        actors.into_iter().map(ActorDto::from).collect(),
        "Movie actors have been fetched",
    )))
}

/// POST /movie/{id}/actors
/// Body is an array of actor ids or `{ "id": ... }` objects. Already linked
/// actors are skipped.
pub async fn link_movie_actors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Vec<ActorRef>>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    let actor_ids: Vec<String> = payload.into_iter().map(ActorRef::into_id).collect();
    if actor_ids.iter().any(|actor_id| actor_id.trim().is_empty()) {
        return Err(ApiError::validation("Invalid fields: actor ids must not be empty"));
    }

    let count = state.store.movies().actors(&id).link_all(&actor_ids).await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} actor(s) have been linked"),
    )))
}

/// PUT /movie/{id}/actors
pub async fn replace_movie_actors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ActorIdsInput>,
) -> Result<Json<ApiResponse<MovieDto>>, ApiError> {
    let movies = state.store.movies();
    movies.actors(&id).replace(&payload.actor_ids).await?;

    let movie = movies.find_by_id(&id, &Filter::default()).await?;

    Ok(Json(ApiResponse::success(
        MovieDto::from(movie),
        "Movie actors have been replaced",
    )))
}

pub async fn patch_movie_actors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
    ApiJson(payload): ApiJson<ActorInput>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    ensure_valid(validate_actor(&payload, Mode::Patch))?;
    let where_clause = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let count = state
        .store
        .movies()
        .actors(&id)
        .patch(payload.into_active_model(), where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} actor(s) have been updated"),
    )))
}

/// Deletes the movie's actors matching `where`, with every link they have.
pub async fn delete_movie_actors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WhereQuery>,
) -> Result<Json<ApiResponse<CountDto>>, ApiError> {
    let where_clause = query.parse()?;
    ensure_movie_exists(&state, &id).await?;

    let count = state
        .store
        .movies()
        .actors(&id)
        .delete(where_clause.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(
        CountDto { count },
        format!("{count} actor(s) have been deleted"),
    )))
}

/// PUT /movies/{id}/actors/{actor_id}
pub async fn link_movie_actor(
    State(state): State<Arc<AppState>>,
    Path((id, actor_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<LinkDto>>, ApiError> {
    let linked = state.store.movies().actors(&id).link(&actor_id).await?;

    let message = if linked {
        "Actor has been linked"
    } else {
        "Actor was already linked"
    };

    Ok(Json(ApiResponse::success(LinkDto { linked }, message)))
}

/// DELETE /movies/{id}/actors/{actor_id}
pub async fn unlink_movie_actor(
    State(state): State<Arc<AppState>>,
    Path((id, actor_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<LinkDto>>, ApiError> {
    if !state.store.movies().actors(&id).unlink(&actor_id).await? {
        return Err(ApiError::NotFound(format!(
            "Movie {id} is not linked to actor {actor_id}"
        )));
    }

    Ok(Json(ApiResponse::success(
        LinkDto { linked: false },
        "Actor has been unlinked",
    )))
}
