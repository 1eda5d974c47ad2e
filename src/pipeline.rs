use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::database_ops::kodik::CatalogSource;
use crate::database_ops::relations::{process_relations, upsert_anime, RelationOutcome};
use crate::database_ops::store::{Store, ANIMES_TABLE};
use crate::error::IngestError;
use crate::normalization::anime::{map_record, raw_title, MapError, MapOptions};
use crate::report::{RunSummary, StoreTotals};

/// Per-record terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Skipped,
    Saved {
        anime_id: i64,
        relations: RelationOutcome,
    },
    Failed,
}

fn preview(names: &[String], max: usize) -> String {
    let shown = names.iter().take(max).cloned().collect::<Vec<_>>().join(", ");
    if names.len() > max {
        format!("{shown}...")
    } else {
        shown
    }
}

/// Map, upsert and link one raw catalog record.
pub async fn process_record(
    store: &dyn Store,
    position: usize,
    raw: &Value,
    opts: MapOptions,
) -> RecordOutcome {
    let title = raw_title(raw);
    let mapped = match map_record(raw, opts) {
        Ok(mapped) => mapped,
        Err(MapError::MissingShikimoriId) => {
            info!(position, title, "skipping record without shikimori_id");
            return RecordOutcome::Skipped;
        }
        Err(err) => {
            error!(position, title, error = %err, "record could not be mapped");
            return RecordOutcome::Failed;
        }
    };

    info!(
        position,
        title,
        shikimori_id = %mapped.row.shikimori_id,
        rating = ?mapped.row.shikimori_rating,
        year = ?mapped.row.year,
        "processing record"
    );

    let anime_id = match upsert_anime(store, &mapped.row).await {
        Ok(id) => id,
        Err(err) => {
            error!(position, title, error = %format!("{err:#}"), "anime upsert failed");
            return RecordOutcome::Failed;
        }
    };
    info!(position, anime_id, "anime saved");

    let mut relations = RelationOutcome::default();
    for (kind, names) in mapped.relations.by_kind() {
        if names.is_empty() {
            continue;
        }
        info!(position, kind = kind.tag(), names = %preview(names, 3), "linking relations");
        relations.absorb(process_relations(store, anime_id, names, kind).await);
    }

    RecordOutcome::Saved {
        anime_id,
        relations,
    }
}

/// Run one ingest pass: connectivity check, single catalog fetch, sequential
/// per-record processing with a fixed pause, then fresh store totals.
pub async fn run(
    cfg: &IngestConfig,
    store: &dyn Store,
    catalog: &dyn CatalogSource,
) -> Result<RunSummary, IngestError> {
    let animes_before = store
        .count(ANIMES_TABLE)
        .await
        .map_err(IngestError::Connectivity)?;
    info!(backend = store.name(), animes = animes_before, "destination store reachable");

    let records = catalog.fetch_page(&cfg.query).await?;
    info!(count = records.len(), "catalog page received");

    let opts = MapOptions {
        normalize_poster_urls: cfg.normalize_poster_urls,
    };
    let mut summary = RunSummary {
        fetched: records.len(),
        animes_before,
        ..RunSummary::default()
    };

    let last = records.len();
    for (idx, raw) in records.iter().enumerate() {
        let position = idx + 1;
        let outcome = process_record(store, position, raw, opts).await;
        let touched_store = match outcome {
            RecordOutcome::Skipped => {
                summary.skipped += 1;
                false
            }
            RecordOutcome::Saved { relations, .. } => {
                summary.processed += 1;
                summary.relations_linked += relations.linked;
                summary.relations_failed += relations.failed;
                true
            }
            RecordOutcome::Failed => {
                summary.failed += 1;
                true
            }
        };
        if touched_store && position < last {
            pause(cfg.record_delay).await;
        }
    }

    summary.totals = match StoreTotals::collect(store).await {
        Ok(totals) => Some(totals),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "could not read final store totals");
            None
        }
    };

    info!(
        fetched = summary.fetched,
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        "ingest pass complete"
    );
    Ok(summary)
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
