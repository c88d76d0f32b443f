//! Refresh pipeline: fetch both upstreams, reconcile, record status, render.

use chrono::{DateTime, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::database_ops::db::Db;
use crate::database_ops::reconcile::{derive_batch, GdpMultiplier};
use crate::database_ops::source::{CountryDataSource, UpstreamError};
use crate::render::summary::TOP_N;
use crate::render::{write_summary, SummaryEntry, SummaryInput};

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Nothing was written; the previous state is intact.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub upserted: usize,
    pub total_countries: i64,
    pub refreshed_at: DateTime<Utc>,
    pub image_path: PathBuf,
}

#[derive(Clone)]
pub struct RefreshService {
    db: Db,
    source: Arc<dyn CountryDataSource>,
    summary_path: PathBuf,
}

impl RefreshService {
    pub fn new(db: Db, source: Arc<dyn CountryDataSource>, summary_path: PathBuf) -> Self {
        Self {
            db,
            source,
            summary_path,
        }
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    /// Run one full refresh.
    ///
    /// An upstream failure aborts before any write. The image is produced
    /// after the database commit, so an image error leaves the new data in
    /// place and still reports failure.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        multiplier: &mut dyn GdpMultiplier,
    ) -> Result<RefreshOutcome, RefreshError> {
        let started = Instant::now();
        let snapshot = self.source.fetch().await.inspect_err(|e| {
            warn!(error = %e, "refresh aborted: upstream unavailable");
        })?;

        let batch = derive_batch(&snapshot.countries, &snapshot.rates, multiplier);
        let upserted = self.db.reconcile_batch(&batch).await?;

        let total_countries = self.db.count_countries().await?;
        let refreshed_at = Utc::now().trunc_subsecs(3);
        self.db.record_refresh(total_countries, refreshed_at).await?;

        let top = self
            .db
            .top_countries_by_gdp(TOP_N as i64)
            .await?
            .into_iter()
            .filter_map(|row| {
                row.estimated_gdp.map(|gdp| SummaryEntry {
                    name: row.name,
                    estimated_gdp: gdp,
                })
            })
            .collect();
        let input = SummaryInput {
            total_countries,
            refreshed_at,
            top,
        };

        let path = self.summary_path.clone();
        tokio::task::spawn_blocking(move || write_summary(&path, &input))
            .await
            .map_err(anyhow::Error::from)??;

        info!(
            upserted,
            total_countries,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh complete"
        );
        Ok(RefreshOutcome {
            upserted,
            total_countries,
            refreshed_at,
            image_path: self.summary_path.clone(),
        })
    }
}
