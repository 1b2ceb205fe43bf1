use axum::{extract::State, http::Request, middleware::Next, response::Response};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Deserialize)]
struct ApiKeyQuery {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

/// Pre-shared key gate. Accepts the key via the `X-API-Key` header or
/// an `apiKey` query parameter; rejects with 401 on absence or mismatch.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let provided = match header_key {
        Some(key) => Some(key),
        None => query_api_key(request.uri().query()),
    }
    .ok_or(AppError::Unauthorized)?;

    if constant_time_eq(provided.as_bytes(), state.settings.api_key.as_bytes()) {
        Ok(next.run(request).await)
    } else {
        Err(AppError::Unauthorized)
    }
}

fn query_api_key(query_str: Option<&str>) -> Option<String> {
    let query_str = query_str?;
    serde_urlencoded::from_str::<ApiKeyQuery>(query_str)
        .ok()
        .and_then(|q| q.api_key)
}

/// Compares two byte strings in time independent of where they first differ,
/// so a timing side-channel can't be used to guess the configured key one
/// byte at a time. Unequal lengths short-circuit to `false` (length itself is
/// not the secret being protected).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"secret", b"secret"));
    }

    #[test]
    fn constant_time_eq_rejects_mismatched_slices() {
        assert!(!constant_time_eq(b"secret", b"wrong-1"));
    }

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq(b"short", b"much-longer-value"));
    }

    #[test]
    fn query_api_key_reads_apikey_param() {
        assert_eq!(
            query_api_key(Some("apiKey=secret&other=1")),
            Some("secret".to_string())
        );
    }

    #[test]
    fn query_api_key_absent_returns_none() {
        assert_eq!(query_api_key(Some("other=1")), None);
        assert_eq!(query_api_key(None), None);
    }
}
