//! One-shot ingest of a Kodik catalog page into a Supabase datastore.
//!
//! `pipeline::run` fetches one listing page, maps each record onto the `animes`
//! table, upserts it keyed on `shikimori_id`, and links its genres, studios and
//! countries through `anime_relations`.
pub mod config;
pub mod database_ops;
pub mod error;
pub mod logging;
pub mod normalization;
pub mod pipeline;
pub mod report;

pub mod util {
    pub mod env;
}

pub use config::IngestConfig;
pub use error::{FetchError, IngestError};
pub use pipeline::run;
pub use report::{RunSummary, StoreTotals};
