use sea_orm_migration::prelude::*;
use dotenvy::dotenv;

use opus_cache_proxy::migrator::Migrator;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // sea-orm-migration's CLI reads DATABASE_URL; the rest of the service
    // uses NEON_CONNECTION_STRING for the same DSN.
    if std::env::var("DATABASE_URL").is_err() {
        if let Ok(dsn) = std::env::var("NEON_CONNECTION_STRING") {
            unsafe { std::env::set_var("DATABASE_URL", dsn) };
        }
    }

    cli::run_cli(Migrator).await;
}
