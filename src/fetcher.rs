use std::path::{Path, PathBuf};

use tokio::process::Command;
use uuid::Uuid;

use crate::eviction;
use crate::models::TrackTags;
use crate::state::AppState;

/// yt-dlp-compatible CLI: never reimplemented in-process, only invoked and
/// its result inspected.
const EXTRACTOR_BIN: &str = "yt-dlp";
const AUDIO_QUALITY_TIER: &str = "96K";

/// Dispatches a Fetcher for `query`. Spawned as a detached background
/// task by the Cache Coordinator on the `(none|error|cached-missing) →
/// caching` transition; never awaited by the triggering request.
pub fn spawn(state: AppState, query: String, title: String, artist: String) {
    tokio::spawn(async move {
        match run(&state, &query, &title, &artist).await {
            Ok(()) => {
                tracing::info!(%query, "fetcher completed");
                eviction::trigger(state);
            }
            Err(err) => {
                tracing::warn!(%query, error = %err, "fetcher failed");
                if let Err(e) = state.store.mark_error(&query).await {
                    tracing::error!(%query, error = %e, "failed to persist fetcher error");
                }
            }
        }
    });
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("extractor exited with {0}")]
    ExtractorFailed(std::process::ExitStatus),
    #[error("failed to launch extractor: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("extractor reported no output path")]
    NoReportedPath,
    #[error("extractor-reported output path does not exist: {}", .0.display())]
    ReportedPathMissing(PathBuf),
    #[error("rename to final artifact path failed: {0}")]
    Rename(std::io::Error),
    #[error("store write failed: {0}")]
    Store(#[from] sea_orm::DbErr),
}

async fn run(state: &AppState, query: &str, title: &str, artist: &str) -> Result<(), FetchError> {
    let id = Uuid::new_v4();
    let artifact_dir = state.settings.artifact_dir.clone();
    let final_path = artifact_dir.join(format!("{id}.opus"));
    let temp_template = artifact_dir.join(format!("{id}.tmp.%(ext)s"));
    let directive = format!("ytsearch1:{artist} {title} audio");

    let output = Command::new(EXTRACTOR_BIN)
        .arg("--extract-audio")
        .arg("--audio-format")
        .arg("opus")
        .arg("--audio-quality")
        .arg(AUDIO_QUALITY_TIER)
        .arg("--no-playlist")
        .arg("--print")
        .arg("after_move:filepath")
        .arg("-o")
        .arg(&temp_template)
        .arg(&directive)
        .output()
        .await?;

    if !output.status.success() {
        tracing::warn!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "extractor exited non-zero"
        );
        return Err(FetchError::ExtractorFailed(output.status));
    }

    let reported_path = last_non_empty_line(&output.stdout).ok_or(FetchError::NoReportedPath)?;
    let reported_path = PathBuf::from(reported_path);
    if !reported_path.exists() {
        return Err(FetchError::ReportedPathMissing(reported_path));
    }

    tokio::fs::rename(&reported_path, &final_path)
        .await
        .map_err(FetchError::Rename)?;

    let tags = read_tags(&final_path, title, artist).await;

    let file_name = final_path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("final_path was constructed with a basename")
        .to_string();

    state.store.mark_cached(query, &file_name, &tags).await?;
    Ok(())
}

fn last_non_empty_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}

/// Reads container tags from the rendered artifact. Any
/// individual missing field falls back to the caller-supplied title/artist;
/// a read failure never fails the Fetcher, it just falls back entirely.
async fn read_tags(path: &Path, fallback_title: &str, fallback_artist: &str) -> TrackTags {
    let path = path.to_path_buf();
    let fallback_title = fallback_title.to_string();
    let fallback_artist = fallback_artist.to_string();

    tokio::task::spawn_blocking(move || read_tags_blocking(&path, &fallback_title, &fallback_artist))
        .await
        .unwrap_or_else(|_| TrackTags {
            title: fallback_title.clone(),
            artist: fallback_artist.clone(),
            album: None,
            duration: None,
        })
}

fn read_tags_blocking(path: &Path, fallback_title: &str, fallback_artist: &str) -> TrackTags {
    use lofty::file::AudioFile;
    use lofty::prelude::*;
    use lofty::probe::Probe;

    let probed = Probe::open(path).and_then(|p| p.read());
    let Ok(tagged_file) = probed else {
        return TrackTags {
            title: fallback_title.to_string(),
            artist: fallback_artist.to_string(),
            album: None,
            duration: None,
        };
    };

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    let title = tag
        .and_then(|t| t.title())
        .map(|c| c.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());
    let artist = tag
        .and_then(|t| t.artist())
        .map(|c| c.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_artist.to_string());
    let album = tag
        .and_then(|t| t.album())
        .map(|c| c.to_string())
        .filter(|s| !s.is_empty());
    let duration = Some(tagged_file.properties().duration().as_secs_f64());

    TrackTags {
        title,
        artist,
        album,
        duration,
    }
}
