use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, warn};

use crate::database_ops::store::{Store, ANIMES_TABLE, ANIME_RELATIONS_TABLE};
use crate::normalization::anime::AnimeRow;

const ANIME_CONFLICT: &[&str] = &["shikimori_id"];
const NAME_CONFLICT: &[&str] = &["name"];
const LINK_CONFLICT: &[&str] = &["anime_id", "relation_id", "relation_type"];

/// Tag-like entity categories linked to an anime through `anime_relations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Genre,
    Studio,
    Country,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [Self::Genre, Self::Studio, Self::Country];

    /// Value stored in `anime_relations.relation_type`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Genre => "genre",
            Self::Studio => "studio",
            Self::Country => "country",
        }
    }

    /// Table holding the named entities of this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Genre => "genres",
            Self::Studio => "studios",
            Self::Country => "countries",
        }
    }
}

/// What happened to one name list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationOutcome {
    pub linked: usize,
    pub blank: usize,
    pub failed: usize,
}

impl RelationOutcome {
    pub fn absorb(&mut self, other: RelationOutcome) {
        self.linked += other.linked;
        self.blank += other.blank;
        self.failed += other.failed;
    }
}

/// Upsert the primary row keyed on `shikimori_id` and return its internal id.
pub async fn upsert_anime(store: &dyn Store, row: &AnimeRow) -> Result<i64> {
    let payload = serde_json::to_value(row).context("serializing anime row")?;
    store
        .upsert_returning_id(ANIMES_TABLE, &payload, ANIME_CONFLICT)
        .await
        .with_context(|| format!("upserting anime shikimori_id={}", row.shikimori_id))
}

async fn link_one(
    store: &dyn Store,
    anime_id: i64,
    name: &str,
    kind: RelationKind,
) -> Result<i64> {
    let relation_id = store
        .upsert_returning_id(kind.table(), &json!({ "name": name }), NAME_CONFLICT)
        .await?;
    store
        .upsert(
            ANIME_RELATIONS_TABLE,
            &json!({
                "anime_id": anime_id,
                "relation_id": relation_id,
                "relation_type": kind.tag(),
            }),
            LINK_CONFLICT,
        )
        .await?;
    Ok(relation_id)
}

/// Link `anime_id` to every non-blank name in `names`.
///
/// Each name is upserted into the kind's table by `name`, then a join row is
/// upserted on (anime_id, relation_id, relation_type). A failing name is logged
/// and counted; the remaining names are still processed. Nothing is rolled back.
pub async fn process_relations(
    store: &dyn Store,
    anime_id: i64,
    names: &[String],
    kind: RelationKind,
) -> RelationOutcome {
    let mut outcome = RelationOutcome::default();
    if names.is_empty() {
        return outcome;
    }

    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            outcome.blank += 1;
            continue;
        }
        match link_one(store, anime_id, name, kind).await {
            Ok(relation_id) => {
                outcome.linked += 1;
                debug!(anime_id, relation_id, name, kind = kind.tag(), "relation linked");
            }
            Err(err) => {
                outcome.failed += 1;
                warn!(
                    anime_id,
                    name,
                    kind = kind.tag(),
                    error = %format!("{err:#}"),
                    "relation failed"
                );
            }
        }
    }
    outcome
}
