use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::Json,
};

use crate::coordinator::{self, Decision};
use crate::error::AppError;
use crate::models::{PlayRequestDto, PlayResponseDto};
use crate::query::canonical_query;
use crate::state::AppState;

/// `POST /api/play`: returns a stream URL if the track is already
/// cached, `404` if caching has only just been dispatched.
pub async fn play(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PlayResponseDto>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return Err(AppError::UnsupportedMediaType);
    }

    let payload: PlayRequestDto = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?;

    let song = payload.song_name.trim();
    let artist = payload.artist.trim();
    if song.is_empty() || artist.is_empty() {
        return Err(AppError::BadRequest(
            "song_name and artist must be non-empty".to_string(),
        ));
    }

    let query = canonical_query(artist, song);
    let decision = coordinator::lookup(&state, &query, song, artist).await?;

    match decision {
        Decision::ServeCached { file_name } => Ok(Json(PlayResponseDto {
            message: "track is cached".to_string(),
            stream_url: format!("/api/stream/{file_name}"),
        })),
        Decision::Caching => Err(AppError::NotFound),
    }
}
