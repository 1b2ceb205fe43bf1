use std::sync::atomic::Ordering;

use crate::state::AppState;

/// Triggers an eviction sweep as a detached background task, guarded
/// by the process-wide `eviction_running` flag. A sweep already in flight
/// causes this trigger to be dropped, not queued: the next successful
/// Fetcher will trigger another one.
pub fn trigger(state: AppState) {
    if state
        .eviction_running
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        tracing::debug!("eviction sweep already running, dropping trigger");
        return;
    }

    tokio::spawn(async move {
        let result = sweep(&state).await;
        state.eviction_running.store(false, Ordering::Release);
        match result {
            Ok(freed) => {
                if freed > 0 {
                    tracing::info!(freed_bytes = freed, "eviction sweep completed");
                }
            }
            Err(err) => tracing::error!(error = %err, "eviction sweep failed"),
        }
    });
}

async fn sweep(state: &AppState) -> Result<u64, sea_orm::DbErr> {
    let mut total = directory_size(&state.settings.artifact_dir).await;
    if total < state.settings.cache_limit_bytes {
        return Ok(0);
    }

    let victims = state.store.list_cached_lru_asc().await?;
    let mut freed = 0u64;

    for victim in victims {
        if total <= state.settings.cache_target_bytes {
            break;
        }
        let Some(file_name) = victim.file_name.as_deref() else {
            continue;
        };
        let path = state.settings.artifact_dir.join(file_name);

        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::warn!(file_name, error = %err, "eviction: could not stat victim, skipping");
                continue;
            }
        };

        // Unlink precedes row deletion: a crash between the two
        // leaves a stale row that the next lookup repairs, never a
        // deleted row whose artifact still exists.
        if let Err(err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(file_name, error = %err, "eviction: unlink failed, skipping");
            continue;
        }

        if let Err(err) = state.store.delete_by_file_name(file_name).await {
            tracing::error!(file_name, error = %err, "eviction: row delete failed after unlink");
            return Err(err);
        }

        total = total.saturating_sub(size);
        freed += size;
    }

    Ok(freed)
}

async fn directory_size(dir: &std::path::Path) -> u64 {
    let mut total = 0u64;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(error = %err, dir = %dir.display(), "eviction: could not read artifact directory");
            return 0;
        }
    };

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if let Ok(meta) = entry.metadata().await {
                    if meta.is_file() {
                        total += meta.len();
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "eviction: error walking artifact directory");
                break;
            }
        }
    }

    total
}
