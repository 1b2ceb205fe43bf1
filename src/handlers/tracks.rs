use axum::{extract::State, response::Json};

use crate::error::AppError;
use crate::models::TrackListItemDto;
use crate::state::AppState;

/// `GET /api/tracks`: cached tracks ordered by `cached_at desc`.
pub async fn list_tracks(State(state): State<AppState>) -> Result<Json<Vec<TrackListItemDto>>, AppError> {
    let rows = state.store.list_cached_by_recency_desc().await?;
    Ok(Json(rows.into_iter().map(TrackListItemDto::from).collect()))
}
