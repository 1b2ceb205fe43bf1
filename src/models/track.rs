use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum TrackStatus {
    #[sea_orm(string_value = "caching")]
    Caching,
    #[sea_orm(string_value = "cached")]
    Cached,
    #[sea_orm(string_value = "error")]
    Error,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub search_query: String,
    pub status: TrackStatus,
    #[sea_orm(unique)]
    pub file_name: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<f64>,
    pub cached_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Row returned to clients by `GET /api/tracks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackListItemDto {
    pub file_name: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<f64>,
}

impl From<Model> for TrackListItemDto {
    fn from(track: Model) -> Self {
        Self {
            file_name: track.file_name.unwrap_or_default(),
            title: track.title,
            artist: track.artist,
            album: track.album,
            duration: track.duration,
        }
    }
}

/// Body accepted by `POST /api/play`.
#[derive(Debug, Deserialize)]
pub struct PlayRequestDto {
    pub song_name: String,
    pub artist: String,
}

#[derive(Debug, Serialize)]
pub struct PlayResponseDto {
    pub message: String,
    pub stream_url: String,
}

/// Tag fields read from the artifact's container, with caller-supplied fallbacks
/// already applied: a missing tag never fails the Fetcher.
#[derive(Debug, Clone)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<f64>,
}
