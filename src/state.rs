use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::cache::store::TrackStore;
use crate::config::Settings;
use crate::external::spotify::SpotifyAdapter;

/// Process-wide application state: the assembled configuration, the
/// database-backed metadata store, the eviction engine's mutual-exclusion
/// flag, and the external adapter client, bundled into one `Clone`-able
/// struct injected into every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
    pub store: Arc<dyn TrackStore>,
    pub spotify: Arc<SpotifyAdapter>,
    /// Non-blocking try-lock guarding the Eviction Engine: a
    /// sweep already in flight causes a redundant trigger to be dropped.
    pub eviction_running: Arc<AtomicBool>,
}
