#[cfg(test)]
pub mod http_stub;
pub mod kodik;
#[cfg(test)]
pub mod memory;
pub mod pg;
pub mod relations;
pub mod rest;
pub mod store;

use anyhow::Result;

use crate::config::{IngestConfig, StoreBackend};
use store::Store;

/// Open the destination backend selected by the configuration.
pub async fn connect_store(cfg: &IngestConfig) -> Result<Box<dyn Store>> {
    Ok(match &cfg.backend {
        StoreBackend::Rest => Box::new(rest::RestStore::new(
            &cfg.supabase_url,
            &cfg.service_role_key,
        )?),
        StoreBackend::Postgres { database_url } => {
            Box::new(pg::PgStore::connect(database_url, 2).await?)
        }
    })
}
