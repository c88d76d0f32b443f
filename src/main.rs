// HTTP API server binary for country-mirror

use anyhow::Result;
use country_mirror::api::{ApiServer, AppState};
use country_mirror::config::AppConfig;
use country_mirror::database_ops::db::Db;
use country_mirror::database_ops::source::HttpDataSource;
use country_mirror::logging;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing(logging::DEFAULT_FILTER)?;

    tracing::info!("Initializing country-mirror API server");

    let cfg = AppConfig::from_env()?;

    let db = if cfg.storage.auto_migrate {
        Db::connect(&cfg.storage.database_url, cfg.storage.max_connections).await?
    } else {
        Db::connect_no_migrate(&cfg.storage.database_url, cfg.storage.max_connections).await?
    };
    tracing::info!("Database connected successfully");

    let source = Arc::new(HttpDataSource::new(&cfg.upstream)?);
    let state = AppState::new(db, source, &cfg.storage.cache_dir);

    ApiServer::new(&cfg.server).run(state).await?;

    Ok(())
}
