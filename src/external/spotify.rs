use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::AppError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const NOW_PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

/// The External Adapter: a pure client of the Spotify Web API. Holds no
/// database or filesystem state — only the refresh/client credentials and a
/// lazily-obtained access token.
pub struct SpotifyAdapter {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct NowPlayingTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_image_url: Option<String>,
    pub is_playing: bool,
    pub progress_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub response_timestamp: i64,
}

#[derive(Debug, Clone)]
pub enum NowPlaying {
    NotPlaying,
    Playing(NowPlayingTrack),
}

#[derive(Deserialize)]
struct CurrentlyPlayingResponse {
    item: Option<CurrentlyPlayingItem>,
    is_playing: bool,
    progress_ms: Option<i64>,
}

#[derive(Deserialize)]
struct CurrentlyPlayingItem {
    id: String,
    name: String,
    artists: Vec<ArtistObject>,
    album: AlbumObject,
    duration_ms: Option<i64>,
}

#[derive(Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Deserialize)]
struct AlbumObject {
    images: Vec<ImageObject>,
}

#[derive(Deserialize)]
struct ImageObject {
    url: String,
}

impl SpotifyAdapter {
    pub fn new(client_id: String, client_secret: String, refresh_token: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            refresh_token,
            token: Mutex::new(None),
        }
    }

    /// Exchange the long-lived refresh token for a short-lived access token
    /// via HTTP Basic-authed form POST. Always hits the network —
    /// callers that want caching go through `access_token()`.
    pub async fn refresh_access_token(&self) -> Result<String, AppError> {
        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret));

        let response = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", auth))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("spotify token refresh: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "spotify token refresh failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("spotify token response: {e}")))?;

        let mut cached = self.token.lock().await;
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        });

        Ok(token.access_token)
    }

    /// Returns a cached access token, refreshing lazily when absent or
    /// expired. Token refresh is transparent to `now_playing` callers.
    async fn access_token(&self) -> Result<String, AppError> {
        {
            let cached = self.token.lock().await;
            if let Some(cached) = cached.as_ref() {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.access_token.clone());
                }
            }
        }
        self.refresh_access_token().await
    }

    /// Fetches the currently-playing track. `204 No Content`, an empty body,
    /// or a null `item` all collapse to `NotPlaying`. A `401` is
    /// retried exactly once after a forced token refresh.
    pub async fn now_playing(&self) -> Result<NowPlaying, AppError> {
        let token = self.access_token().await?;
        match self.fetch_now_playing(&token).await? {
            FetchOutcome::Unauthorized => {
                let token = self.refresh_access_token().await?;
                match self.fetch_now_playing(&token).await? {
                    FetchOutcome::Unauthorized => Err(AppError::Upstream(
                        "spotify rejected refreshed access token".to_string(),
                    )),
                    FetchOutcome::Body(body) => Ok(parse_now_playing(body)),
                }
            }
            FetchOutcome::Body(body) => Ok(parse_now_playing(body)),
        }
    }

    async fn fetch_now_playing(&self, token: &str) -> Result<FetchOutcome, AppError> {
        let response = self
            .client
            .get(NOW_PLAYING_URL)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("spotify now-playing: {e}")))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(FetchOutcome::Unauthorized);
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(FetchOutcome::Body(None));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "spotify now-playing failed ({status}): {body}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("spotify now-playing body: {e}")))?;
        if text.trim().is_empty() {
            return Ok(FetchOutcome::Body(None));
        }

        let parsed: CurrentlyPlayingResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("spotify now-playing decode: {e}")))?;
        Ok(FetchOutcome::Body(Some(parsed)))
    }
}

enum FetchOutcome {
    Unauthorized,
    Body(Option<CurrentlyPlayingResponse>),
}

fn parse_now_playing(body: Option<CurrentlyPlayingResponse>) -> NowPlaying {
    let Some(body) = body else {
        return NowPlaying::NotPlaying;
    };
    let Some(item) = body.item else {
        return NowPlaying::NotPlaying;
    };

    let artist = item
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    NowPlaying::Playing(NowPlayingTrack {
        id: item.id,
        title: item.name,
        artist,
        album_image_url: item.album.images.first().map(|i| i.url.clone()),
        is_playing: body.is_playing,
        progress_ms: body.progress_ms,
        duration_ms: item.duration_ms,
        response_timestamp: Utc::now().timestamp_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_now_playing_maps_absent_item_to_not_playing() {
        let body = CurrentlyPlayingResponse {
            item: None,
            is_playing: false,
            progress_ms: None,
        };
        assert!(matches!(
            parse_now_playing(Some(body)),
            NowPlaying::NotPlaying
        ));
    }

    #[test]
    fn parse_now_playing_maps_empty_body_to_not_playing() {
        assert!(matches!(parse_now_playing(None), NowPlaying::NotPlaying));
    }

    #[test]
    fn parse_now_playing_joins_multiple_artists_with_comma() {
        let body = CurrentlyPlayingResponse {
            item: Some(CurrentlyPlayingItem {
                id: "abc".to_string(),
                name: "Money".to_string(),
                artists: vec![
                    ArtistObject {
                        name: "Pink Floyd".to_string(),
                    },
                    ArtistObject {
                        name: "David Gilmour".to_string(),
                    },
                ],
                album: AlbumObject {
                    images: vec![ImageObject {
                        url: "https://example.com/cover.jpg".to_string(),
                    }],
                },
                duration_ms: Some(382_000),
            }),
            is_playing: true,
            progress_ms: Some(1000),
        };

        match parse_now_playing(Some(body)) {
            NowPlaying::Playing(track) => {
                assert_eq!(track.artist, "Pink Floyd, David Gilmour");
                assert_eq!(
                    track.album_image_url.as_deref(),
                    Some("https://example.com/cover.jpg")
                );
            }
            NowPlaying::NotPlaying => panic!("expected Playing"),
        }
    }

    #[test]
    fn parse_now_playing_handles_missing_album_art() {
        let body = CurrentlyPlayingResponse {
            item: Some(CurrentlyPlayingItem {
                id: "abc".to_string(),
                name: "Money".to_string(),
                artists: vec![ArtistObject {
                    name: "Pink Floyd".to_string(),
                }],
                album: AlbumObject { images: vec![] },
                duration_ms: None,
            }),
            is_playing: true,
            progress_ms: None,
        };

        match parse_now_playing(Some(body)) {
            NowPlaying::Playing(track) => assert_eq!(track.album_image_url, None),
            NowPlaying::NotPlaying => panic!("expected Playing"),
        }
    }
}
