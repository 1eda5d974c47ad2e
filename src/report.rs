use anyhow::Result;
use std::fmt;

use crate::database_ops::relations::RelationKind;
use crate::database_ops::store::{Store, ANIMES_TABLE};

/// Row counts read fresh from the destination store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreTotals {
    pub animes: i64,
    pub genres: i64,
    pub studios: i64,
    pub countries: i64,
}

impl StoreTotals {
    pub async fn collect(store: &dyn Store) -> Result<Self> {
        let mut totals = Self {
            animes: store.count(ANIMES_TABLE).await?,
            ..Self::default()
        };
        for kind in RelationKind::ALL {
            let n = store.count(kind.table()).await?;
            match kind {
                RelationKind::Genre => totals.genres = n,
                RelationKind::Studio => totals.studios = n,
                RelationKind::Country => totals.countries = n,
            }
        }
        Ok(totals)
    }
}

/// Outcome of one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub relations_linked: usize,
    pub relations_failed: usize,
    pub animes_before: i64,
    /// `None` when the closing count queries failed.
    pub totals: Option<StoreTotals>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ingest finished")?;
        writeln!(
            f,
            "  processed: {} of {} (skipped {}, failed {})",
            self.processed, self.fetched, self.skipped, self.failed
        )?;
        writeln!(
            f,
            "  relations: {} linked, {} failed",
            self.relations_linked, self.relations_failed
        )?;
        match &self.totals {
            Some(t) => {
                writeln!(
                    f,
                    "  animes in store: {} (was {})",
                    t.animes, self.animes_before
                )?;
                writeln!(f, "  genres in store: {}", t.genres)?;
                writeln!(f, "  studios in store: {}", t.studios)?;
                write!(f, "  countries in store: {}", t.countries)
            }
            None => write!(f, "  store totals unavailable"),
        }
    }
}
