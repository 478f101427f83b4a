use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::extract::{ApiJson, FilterQuery};
use super::types::{ActorDto, ActorInput, NoData};
use super::validation::{Mode, ensure_valid, validate_actor, validate_search_query};
use super::{ApiError, ApiResponse, AppState};

pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ActorInput>,
) -> Result<Json<ApiResponse<ActorDto>>, ApiError> {
    ensure_valid(validate_actor(&payload, Mode::Create))?;

    let actor = state
        .store
        .actors()
        .create(payload.into_active_model())
        .await?;

    tracing::info!(actor_id = %actor.id, "Actor created");

    Ok(Json(ApiResponse::success(
        ActorDto::from(actor),
        "Actor has been created",
    )))
}

pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<ActorDto>>>, ApiError> {
    let filter = query.parse()?;
    let actors = state.store.actors().find(&filter).await?;

    Ok(Json(ApiResponse::success(
        actors.into_iter().map(ActorDto::from).collect(),
        "All actors have been fetched",
    )))
}

pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<ActorDto>>, ApiError> {
    let filter = query.parse()?;
    let actor = state.store.actors().find_by_id(&id, &filter).await?;

    Ok(Json(ApiResponse::success(
        ActorDto::from(actor),
        "Actor has been fetched",
    )))
}

/// GET /actor/search/{name}
pub async fn search_actors(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<ActorDto>>>, ApiError> {
    let prefix = validate_search_query(&name)?;
    let actors = state.store.actors().search_by_first_name(prefix).await?;

    let message = if actors.is_empty() {
        format!("No actors found matching '{prefix}'")
    } else {
        format!("Found {} actor(s)", actors.len())
    };

    Ok(Json(ApiResponse::success(
        actors.into_iter().map(ActorDto::from).collect(),
        message,
    )))
}

pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ActorInput>,
) -> Result<Json<ApiResponse<ActorDto>>, ApiError> {
    ensure_valid(validate_actor(&payload, Mode::Patch))?;

    let actor = state
        .store
        .actors()
        .update_by_id(&id, payload.into_active_model())
        .await?;

    Ok(Json(ApiResponse::success(
        ActorDto::from(actor),
        "Actor has been updated",
    )))
}

pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NoData>>, ApiError> {
    state.store.actors().delete_by_id(&id).await?;

    tracing::info!(actor_id = %id, "Actor deleted");

    Ok(Json(ApiResponse::empty("Actor has been deleted")))
}
