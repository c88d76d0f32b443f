use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Server default when `RUST_LOG` is not set: our own spans at info, sqlx
/// statement logging only when something is slow or wrong.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Admin CLI default; it prints results on stdout, so logs stay quiet.
pub const CLI_FILTER: &str = "warn,country_mirror=info";

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Both `country-mirror` and `country-admin` call this before reading config,
/// so the configuration snapshot and migration logs are captured.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_parse() {
        for directive in [DEFAULT_FILTER, CLI_FILTER] {
            assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
        }
    }
}
