use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt;
use tracing::{info, instrument, warn};

use crate::config::UpstreamConfig;
use crate::database_ops::exchange::RateTable;
use crate::normalization::RawCountry;

/// Which upstream API a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamApi {
    Countries,
    Exchange,
}

impl fmt::Display for UpstreamApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamApi::Countries => f.write_str("Countries"),
            UpstreamApi::Exchange => f.write_str("Exchange"),
        }
    }
}

/// Any reason the upstream data could not be obtained. All variants map to a
/// single "source unavailable" condition for callers.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{api} API answered with status {status}")]
    Status { api: UpstreamApi, status: u16 },
    #[error("undecodable {api} payload: {reason}")]
    Decode { api: UpstreamApi, reason: String },
}

impl UpstreamError {
    pub fn decode(api: UpstreamApi, reason: impl fmt::Display) -> Self {
        UpstreamError::Decode {
            api,
            reason: reason.to_string(),
        }
    }

    /// Client-facing explanation for the 503 body.
    pub fn details(&self) -> String {
        match self {
            UpstreamError::Transport(_) => {
                "Could not fetch data from Countries or Exchange API".to_string()
            }
            UpstreamError::Status { api, .. } => format!("Could not fetch data from {api} API"),
            UpstreamError::Decode { .. } => "Invalid JSON from APIs".to_string(),
        }
    }
}

/// Everything one refresh needs from upstream.
#[derive(Debug, Clone, Default)]
pub struct UpstreamSnapshot {
    pub countries: Vec<RawCountry>,
    pub rates: RateTable,
}

#[async_trait]
pub trait CountryDataSource: Send + Sync {
    /// Fetch the full catalog and the rate table. Either both succeed or the
    /// whole fetch fails.
    async fn fetch(&self) -> Result<UpstreamSnapshot, UpstreamError>;
}

/// Decode the countries catalog body: a JSON array of objects.
pub fn decode_countries(body: &[u8]) -> Result<Vec<RawCountry>, UpstreamError> {
    serde_json::from_slice(body).map_err(|e| UpstreamError::decode(UpstreamApi::Countries, e))
}

/// Production source backed by the two public REST APIs.
#[derive(Clone)]
pub struct HttpDataSource {
    http: Client,
    countries_url: String,
    exchange_url: String,
}

impl HttpDataSource {
    pub fn new(cfg: &UpstreamConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("country-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            countries_url: cfg.countries_url.clone(),
            exchange_url: cfg.exchange_url.clone(),
        })
    }

    async fn send(&self, url: &str) -> Result<Response, UpstreamError> {
        self.http.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, "upstream request failed");
            UpstreamError::Transport(e)
        })
    }
}

fn check_status(api: UpstreamApi, resp: &Response) -> Result<(), UpstreamError> {
    let status = resp.status();
    if status.as_u16() == 200 {
        return Ok(());
    }
    warn!(%api, status = status.as_u16(), "upstream answered with non-200 status");
    Err(UpstreamError::Status {
        api,
        status: status.as_u16(),
    })
}

#[async_trait]
impl CountryDataSource for HttpDataSource {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<UpstreamSnapshot, UpstreamError> {
        let countries_resp = self.send(&self.countries_url).await?;
        let exchange_resp = self.send(&self.exchange_url).await?;

        check_status(UpstreamApi::Countries, &countries_resp)?;
        check_status(UpstreamApi::Exchange, &exchange_resp)?;

        let countries_body = countries_resp
            .bytes()
            .await
            .map_err(UpstreamError::Transport)?;
        let exchange_body = exchange_resp
            .bytes()
            .await
            .map_err(UpstreamError::Transport)?;

        let countries = decode_countries(&countries_body)?;
        let rates = RateTable::from_slice(&exchange_body)?;

        info!(
            countries = countries.len(),
            rates = rates.len(),
            "fetched upstream snapshot"
        );
        Ok(UpstreamSnapshot { countries, rates })
    }
}
