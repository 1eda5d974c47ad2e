//! Kodik catalog (`https://kodikapi.com`) listing client and payload types.
pub mod provider;
pub mod types;

pub use provider::{CatalogSource, KodikProvider};
pub use types::{KodikRecord, MaterialData};
