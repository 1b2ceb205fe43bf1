use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opus_cache_proxy::app;
use opus_cache_proxy::cache::store::SeaOrmTrackStore;
use opus_cache_proxy::config::Settings;
use opus_cache_proxy::external::spotify::SpotifyAdapter;
use opus_cache_proxy::migrator::Migrator;
use opus_cache_proxy::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("configuration error")?;

    std::fs::create_dir_all(&settings.artifact_dir).context("failed to create artifact directory")?;

    info!("connecting to metadata store");
    let db = Database::connect(&settings.database_url)
        .await
        .context("failed to connect to metadata store")?;

    info!("running metadata store migrations");
    Migrator::up(&db, None).await.context("migration failed")?;

    let spotify = SpotifyAdapter::new(
        settings.spotify_client_id.clone(),
        settings.spotify_client_secret.clone(),
        settings.spotify_refresh_token.clone(),
    );

    let port = settings.port;
    let state = AppState {
        settings: Arc::new(settings),
        store: Arc::new(SeaOrmTrackStore::new(db.clone())),
        db,
        spotify: Arc::new(spotify),
        eviction_running: Arc::new(AtomicBool::new(false)),
    };

    let app = app::router(state);

    let address = format!("0.0.0.0:{port}");
    info!("opus cache proxy listening on {address}");

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}
