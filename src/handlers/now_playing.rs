use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::coordinator::{self, Decision};
use crate::error::AppError;
use crate::external::spotify::NowPlaying;
use crate::query::canonical_query;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingResponse {
    pub status: &'static str,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_image_url: Option<String>,
    pub is_playing: Option<bool>,
    pub time_played: Option<i64>,
    pub time_total: Option<i64>,
    pub timestamp: Option<i64>,
    pub id: Option<String>,
}

impl NowPlayingResponse {
    fn not_playing() -> Self {
        Self {
            status: "not_playing",
            title: None,
            artist: None,
            album_image_url: None,
            is_playing: None,
            time_played: None,
            time_total: None,
            timestamp: None,
            id: None,
        }
    }
}

/// `GET /api/now-playing`: queries the external adapter for the
/// currently-playing track and eagerly triggers caching for it.
pub async fn now_playing(State(state): State<AppState>) -> Result<Json<NowPlayingResponse>, AppError> {
    let playing = state.spotify.now_playing().await?;

    let track = match playing {
        NowPlaying::NotPlaying => return Ok(Json(NowPlayingResponse::not_playing())),
        NowPlaying::Playing(track) => track,
    };

    let query = canonical_query(&track.artist, &track.title);
    let decision = coordinator::lookup(&state, &query, &track.title, &track.artist).await?;
    let status = match decision {
        Decision::ServeCached { .. } => "cached",
        Decision::Caching => "caching",
    };

    Ok(Json(NowPlayingResponse {
        status,
        title: Some(track.title),
        artist: Some(track.artist),
        album_image_url: track.album_image_url,
        is_playing: Some(track.is_playing),
        time_played: track.progress_ms,
        time_total: track.duration_ms,
        timestamp: Some(track.response_timestamp),
        id: Some(track.id),
    }))
}
