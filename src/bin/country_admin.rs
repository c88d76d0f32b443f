use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use country_mirror::api::state::summary_path;
use country_mirror::config::AppConfig;
use country_mirror::database_ops::countries::{CountryFilter, SortOrder};
use country_mirror::database_ops::db::Db;
use country_mirror::database_ops::reconcile::RandomMultiplier;
use country_mirror::database_ops::refresh::RefreshService;
use country_mirror::database_ops::source::HttpDataSource;
use country_mirror::logging;
use country_mirror::util::env::redact_url;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "country-admin", version, about = "country-mirror admin CLI")]
struct Cli {
    /// Optional override for the database URL
    #[arg(long, global = true)]
    db_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Fetch both upstream APIs, rebuild the table and render the summary image
    Refresh {
        /// Seed the GDP multiplier for reproducible estimates
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the last refresh snapshot
    Status,
    /// Print stored countries as JSON
    List {
        /// Case-insensitive region filter
        #[arg(long)]
        region: Option<String>,
        /// Case-insensitive currency code filter
        #[arg(long)]
        currency: Option<String>,
        /// gdp_desc or gdp_asc
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortOrder>,
    },
}

fn parse_sort(raw: &str) -> Result<SortOrder, String> {
    SortOrder::parse(raw).ok_or_else(|| format!("unknown sort '{raw}' (gdp_desc|gdp_asc)"))
}

async fn open_db(cfg: &AppConfig, override_url: Option<&str>) -> Result<Db> {
    let url = override_url.unwrap_or(&cfg.storage.database_url);
    info!(url = %redact_url(url), "connecting");
    let db = if cfg.storage.auto_migrate {
        Db::connect(url, cfg.storage.max_connections).await?
    } else {
        Db::connect_no_migrate(url, cfg.storage.max_connections).await?
    };
    Ok(db)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing(logging::CLI_FILTER)?;

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    let db = open_db(&cfg, cli.db_url.as_deref()).await?;

    match cli.command {
        Commands::Refresh { seed } => {
            let source = Arc::new(HttpDataSource::new(&cfg.upstream)?);
            let service =
                RefreshService::new(db, source, summary_path(&cfg.storage.cache_dir));
            let mut multiplier = match seed {
                Some(seed) => RandomMultiplier::seeded(seed),
                None => RandomMultiplier::from_entropy(),
            };
            let outcome = service.run(&mut multiplier).await?;
            print_json(&serde_json::json!({
                "message": "Countries refreshed successfully",
                "total_countries": outcome.total_countries,
                "upserted": outcome.upserted,
                "last_refreshed_at": outcome.refreshed_at,
                "image": outcome.image_path.display().to_string(),
            }))?;
        }
        Commands::Status => {
            print_json(&db.refresh_status().await?)?;
        }
        Commands::List {
            region,
            currency,
            sort,
        } => {
            let rows = db
                .list_countries(&CountryFilter {
                    region,
                    currency,
                    sort,
                })
                .await?;
            print_json(&rows)?;
        }
    }

    Ok(())
}
