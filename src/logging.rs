use anyhow::anyhow;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the process-wide log subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("log subscriber already installed: {e}"))
}
