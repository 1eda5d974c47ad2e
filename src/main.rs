use anyhow::{Context, Result};
use anime_catalog_ingest::database_ops::connect_store;
use anime_catalog_ingest::database_ops::kodik::KodikProvider;
use anime_catalog_ingest::{logging, pipeline, IngestConfig, IngestError};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    anime_catalog_ingest::util::env::init_env();
    logging::init_tracing("info,sqlx=warn")?;

    let cfg = IngestConfig::from_env()?;
    cfg.log_snapshot();

    let store = connect_store(&cfg)
        .await
        .map_err(IngestError::Connectivity)?;
    let catalog = KodikProvider::from_config(&cfg).context("building Kodik client")?;

    info!("starting ingest run");
    match pipeline::run(&cfg, store.as_ref(), &catalog).await {
        Ok(summary) => {
            println!("{summary}");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "ingest aborted");
            Err(err.into())
        }
    }
}
