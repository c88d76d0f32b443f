use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    /// Open the pool and apply pending migrations.
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let db = Self::connect_no_migrate(database_url, max_connections).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    // Variant that NEVER runs migrations (schema managed out of band).
    #[instrument(skip(database_url))]
    pub async fn connect_no_migrate(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = is_in_memory(database_url);
        let mut connect_options = SqliteConnectOptions::from_str(database_url)
            .context("invalid DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so the pool must
        // hold exactly one connection and never recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .context("failed to open sqlite pool")?;
        info!(in_memory, "connected to db");
        Ok(Self { pool })
    }

    /// Apply the embedded migrations under `migrations/`.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to apply migrations")?;
        info!("migrations up-to-date");
        Ok(())
    }

    /// Cheap round-trip used by the health probe.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[cfg(test)]
pub(crate) async fn test_db() -> Db {
    Db::connect("sqlite::memory:", 1).await.unwrap()
}
