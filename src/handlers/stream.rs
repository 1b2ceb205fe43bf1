use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::coordinator;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/stream/<name>`: range-capable file server over the
/// Artifact Store, with path-traversal containment and asynchronous touch.
pub async fn stream(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    check_basename(&name)?;

    let path = state.settings.artifact_dir.join(&name);
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(AppError::NotFound),
    };
    let file_size = metadata.len();

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, file_size))
        .transpose()?;

    let mut file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::Internal(format!("open artifact: {e}")))?;

    let response = match range {
        None => {
            let mut buf = Vec::with_capacity(file_size as usize);
            file.read_to_end(&mut buf)
                .await
                .map_err(|e| AppError::Internal(format!("read artifact: {e}")))?;

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "audio/opus")
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, buf.len())
                .body(Body::from(buf))
                .map_err(|e| AppError::Internal(e.to_string()))?
        }
        Some((start, end)) => {
            let len = end - start + 1;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::Internal(format!("seek artifact: {e}")))?;
            let mut buf = vec![0u8; len as usize];
            file.read_exact(&mut buf)
                .await
                .map_err(|e| AppError::Internal(format!("read artifact range: {e}")))?;

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, "audio/opus")
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, buf.len())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{file_size}"),
                )
                .body(Body::from(buf))
                .map_err(|e| AppError::Internal(e.to_string()))?
        }
    };

    coordinator::touch(state, name);
    Ok(response.into_response())
}

/// Rejects any filename parameter containing a path separator or a `..`
/// component. The streaming server never sees a nested path.
fn check_basename(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.split('/').any(|part| part == "..")
        || name == ".."
        || name == "."
    {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Parses `Range: bytes=<start>-<end?>`. A subset of RFC 7233:
/// multi-range and suffix (`-N`) requests are not supported.
fn parse_range(header_value: &str, file_size: u64) -> Result<(u64, u64), AppError> {
    let spec = header_value
        .strip_prefix("bytes=")
        .ok_or_else(|| AppError::BadRequest("unsupported range unit".to_string()))?;

    let (start_str, end_str) = spec
        .split_once('-')
        .ok_or_else(|| AppError::BadRequest("malformed range".to_string()))?;

    let start: u64 = start_str
        .parse()
        .map_err(|_| AppError::BadRequest("malformed range start".to_string()))?;

    let end: u64 = if end_str.is_empty() {
        file_size.saturating_sub(1)
    } else {
        end_str
            .parse()
            .map_err(|_| AppError::BadRequest("malformed range end".to_string()))?
    };

    if start >= file_size || end >= file_size || start > end {
        return Err(AppError::RangeNotSatisfiable);
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_filenames_with_separators() {
        assert!(check_basename("../etc/passwd").is_err());
        assert!(check_basename("a/b.opus").is_err());
        assert!(check_basename("a\\b.opus").is_err());
    }

    #[test]
    fn rejects_bare_dotdot() {
        assert!(check_basename("..").is_err());
    }

    #[test]
    fn accepts_plain_basename() {
        assert!(check_basename("abc-123.opus").is_ok());
    }

    #[test]
    fn parse_range_defaults_end_to_file_size_minus_one() {
        let (start, end) = parse_range("bytes=0-", 2048).unwrap();
        assert_eq!((start, end), (0, 2047));
    }

    #[test]
    fn parse_range_honors_explicit_end() {
        let (start, end) = parse_range("bytes=0-1023", 2048).unwrap();
        assert_eq!((start, end), (0, 1023));
    }

    #[test]
    fn parse_range_rejects_start_past_eof() {
        assert!(matches!(
            parse_range("bytes=999999999-", 2048),
            Err(AppError::RangeNotSatisfiable)
        ));
    }

    #[test]
    fn parse_range_rejects_inverted_bounds() {
        assert!(matches!(
            parse_range("bytes=100-50", 2048),
            Err(AppError::RangeNotSatisfiable)
        ));
    }
}
