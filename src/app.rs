use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_api_key;
use crate::handlers::{
    health::health, now_playing::now_playing, play::play, stream::stream, tracks::list_tracks,
};
use crate::request_id::request_id;
use crate::state::AppState;

/// Assembles the full route table: public health check, and the
/// pre-shared-key-gated API surface.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let protected = Router::new()
        .route("/api/now-playing", get(now_playing))
        .route("/api/tracks", get(list_tracks))
        .route("/api/play", post(play))
        .route("/api/stream/{name}", get(stream))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(cors)
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
