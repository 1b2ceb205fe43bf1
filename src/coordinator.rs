use sea_orm::DbErr;

use crate::cache::store::InsertOutcome;
use crate::fetcher;
use crate::models::TrackStatus;
use crate::state::AppState;

/// Outcome of `lookup`: what the Streaming Server should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ServeCached { file_name: String },
    Caching,
}

/// The Cache Coordinator: consults the Metadata Store, repairs
/// missing-file rows, and dispatches at-most-once Fetchers. Never reads or
/// writes the Artifact Store itself beyond an existence check.
pub async fn lookup(
    state: &AppState,
    query: &str,
    title: &str,
    artist: &str,
) -> Result<Decision, DbErr> {
    let record = state.store.get(query).await?;

    match record {
        Some(record) if record.status == TrackStatus::Cached => {
            let file_name = record.file_name.clone();
            let exists = match &file_name {
                Some(name) => state.settings.artifact_dir.join(name).exists(),
                None => false,
            };

            match file_name {
                Some(file_name) if exists => Ok(Decision::ServeCached { file_name }),
                _ => {
                    // cached row, missing artifact: repair by resetting and redispatching.
                    state.store.reset_to_caching(query).await?;
                    fetcher::spawn(state.clone(), query.to_string(), title.to_string(), artist.to_string());
                    Ok(Decision::Caching)
                }
            }
        }
        Some(record) if record.status == TrackStatus::Caching => Ok(Decision::Caching),
        Some(_) /* Error */ => {
            // `error` rows are sticky only until the next lookup: this
            // transition always dispatches because `try_insert_caching`
            // leaves an existing row untouched, so we reset explicitly.
            state.store.reset_to_caching(query).await?;
            fetcher::spawn(state.clone(), query.to_string(), title.to_string(), artist.to_string());
            Ok(Decision::Caching)
        }
        None => {
            match state.store.try_insert_caching(query).await? {
                InsertOutcome::Inserted => {
                    fetcher::spawn(state.clone(), query.to_string(), title.to_string(), artist.to_string());
                }
                InsertOutcome::Existed(_) => {
                    // Lost the race to a concurrent lookup; that caller
                    // already dispatched the single Fetcher for this query.
                }
            }
            Ok(Decision::Caching)
        }
    }
}

/// Asynchronously updates `last_accessed_at` for a streamed artifact.
/// Failures are logged, never surfaced to the client.
pub fn touch(state: AppState, file_name: String) {
    tokio::spawn(async move {
        if let Err(err) = state.store.touch(&file_name).await {
            tracing::warn!(file_name, error = %err, "touch failed");
        }
    });
}
