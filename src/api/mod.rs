use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService, TokenService};

mod actor_movies;
mod actors;
pub mod auth;
mod error;
mod extract;
mod movie_actors;
mod movies;
mod observability;
mod reviews;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,

    pub config: Arc<Config>,

    pub auth: Arc<dyn AuthService>,

    pub tokens: TokenService,

    pub start_time: Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

#[must_use]
pub fn create_app_state(
    store: Store,
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let tokens = TokenService::from_config(&config.security);
    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens.clone(),
        config.security.clone(),
    ));

    Arc::new(AppState {
        store,
        config: Arc::new(config),
        auth,
        tokens,
        start_time: Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    config.validate()?;

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(create_app_state(store, config, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_protected_router(state.clone()))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    api_router
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/actor", get(actors::list_actors))
        .route("/actor/{id}", get(actors::get_actor))
        .route("/actor/search/{name}", get(actors::search_actors))
        .route("/actors/{id}/movies", get(actor_movies::list_actor_movies))
        .route("/movie", get(movies::list_movies))
        .route("/movies", get(movies::list_movies))
        .route("/movie/{id}", get(movies::get_movie))
        .route("/movie/search/{title}", get(movies::search_movies))
        .route("/movie/{id}/reviews", get(movies::list_movie_reviews))
        .route("/movies/{id}/actors", get(movie_actors::list_movie_actors))
        .route("/review", get(reviews::list_reviews))
        .route("/review/{id}", get(reviews::get_review))
        .route("/reviews/{id}/user", get(reviews::get_review_author))
        .route("/users/{id}/reviews", get(users::list_user_reviews))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/whoami", get(auth::whoami))
        .route("/users/list", get(users::list_users))
        .route("/user/{id}", patch(users::update_user))
        .route("/user/{id}", delete(users::delete_user))
        .route("/actor", post(actors::create_actor))
        .route("/actor/{id}", patch(actors::update_actor))
        .route("/actor/{id}", delete(actors::delete_actor))
        .route("/actors/{id}/movies", post(actor_movies::create_actor_movie))
        .route("/actors/{id}/movies", patch(actor_movies::patch_actor_movies))
        .route("/actors/{id}/movies", delete(actor_movies::delete_actor_movies))
        .route(
            "/actors/{id}/movies/{movie_id}",
            put(actor_movies::link_actor_movie),
        )
        .route(
            "/actors/{id}/movies/{movie_id}",
            delete(actor_movies::unlink_actor_movie),
        )
        .route("/movie", post(movies::create_movie))
        .route("/movie/{id}", patch(movies::update_movie))
        .route("/movie/{id}", delete(movies::delete_movie))
        .route("/movie/{id}/reviews", post(movies::create_movie_review))
        .route("/movie/{id}/reviews", patch(movies::patch_movie_reviews))
        .route("/movie/{id}/reviews", delete(movies::delete_movie_reviews))
        .route("/movie/{id}/actors", post(movie_actors::link_movie_actors))
        .route("/movie/{id}/actors", put(movie_actors::replace_movie_actors))
        .route("/movies/{id}/actors", patch(movie_actors::patch_movie_actors))
        .route("/movies/{id}/actors", delete(movie_actors::delete_movie_actors))
        .route(
            "/movies/{id}/actors/{actor_id}",
            put(movie_actors::link_movie_actor),
        )
        .route(
            "/movies/{id}/actors/{actor_id}",
            delete(movie_actors::unlink_movie_actor),
        )
        .route("/review", post(reviews::create_review))
        .route("/review/{id}", patch(reviews::update_review))
        .route("/review/{id}", delete(reviews::delete_review))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
