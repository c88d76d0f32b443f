// API server implementation using actix-web

use crate::api::state::AppState;
use crate::api::{middleware, routes};
use crate::config::ServerConfig;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    pub fn new(cfg: &ServerConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            allowed_origins: cfg.allowed_origins.clone(),
        }
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            summary = %state.summary_path().display(),
            "Starting country-mirror API server"
        );

        let state = web::Data::new(state);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
