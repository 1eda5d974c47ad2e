use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::database_ops::kodik::{KodikRecord, MaterialData};
use crate::database_ops::relations::RelationKind;
use crate::normalization::image_url::normalize_shikimori_image_url;

/// `screenshots` column payload: the list is stored wrapped, never bare.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenshotEnvelope {
    pub screenshots: Vec<String>,
}

/// One row of the `animes` table, keyed on `shikimori_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeRow {
    pub kodik_id: Option<String>,
    pub shikimori_id: String,
    pub kinopoisk_id: Option<String>,
    pub title: Option<String>,
    pub title_orig: Option<String>,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub player_link: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub episodes_count: Option<i32>,
    pub rating_mpaa: Option<String>,
    pub kinopoisk_rating: Option<f64>,
    pub imdb_rating: Option<f64>,
    pub shikimori_rating: Option<f64>,
    pub kinopoisk_votes: Option<i64>,
    pub shikimori_votes: Option<i64>,
    pub screenshots: ScreenshotEnvelope,
    pub updated_at_kodik: Option<DateTime<Utc>>,
}

/// Tag names attached to one record, in upstream order (duplicates kept).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationNames {
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub countries: Vec<String>,
}

impl RelationNames {
    pub fn by_kind(&self) -> [(RelationKind, &[String]); 3] {
        [
            (RelationKind::Genre, self.genres.as_slice()),
            (RelationKind::Studio, self.studios.as_slice()),
            (RelationKind::Country, self.countries.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    pub row: AnimeRow,
    pub relations: RelationNames,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MapOptions {
    /// Canonicalize Shikimori poster hosts before storing.
    pub normalize_poster_urls: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("no shikimori_id")]
    MissingShikimoriId,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Shikimori id as it appears in the raw payload (string or number), if usable.
pub fn raw_shikimori_id(raw: &Value) -> Option<String> {
    match raw.get("shikimori_id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        // numeric zero is never a real Shikimori id
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Title used in log lines, tolerant of records we cannot decode.
pub fn raw_title(raw: &Value) -> &str {
    raw.get("title").and_then(Value::as_str).unwrap_or("<untitled>")
}

/// Primary if present and non-blank, else secondary if non-blank, else `None`.
fn first_non_empty(primary: Option<&str>, secondary: Option<&str>) -> Option<String> {
    [primary, secondary]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn parse_updated_at(raw: Option<&str>, shikimori_id: &str) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(err) => {
            warn!(shikimori_id, value = raw, error = %err, "unparsable updated_at; storing null");
            None
        }
    }
}

/// Map one raw `/list` entry onto an `animes` row plus its relation names.
pub fn map_record(raw: &Value, opts: MapOptions) -> Result<MappedRecord, MapError> {
    let shikimori_id = raw_shikimori_id(raw).ok_or(MapError::MissingShikimoriId)?;
    let record: KodikRecord = serde_json::from_value(raw.clone())?;
    let material = record.material_data.unwrap_or_default();

    let poster_candidates = [
        material.poster_url.as_deref(),
        material.anime_poster_url.as_deref(),
    ];
    let poster_url = if opts.normalize_poster_urls {
        poster_candidates
            .into_iter()
            .flatten()
            .filter(|url| !url.trim().is_empty())
            .find_map(normalize_shikimori_image_url)
    } else {
        first_non_empty(poster_candidates[0], poster_candidates[1])
    };

    let updated_at_kodik = parse_updated_at(record.updated_at.as_deref(), &shikimori_id);
    let MaterialData {
        anime_title,
        description,
        anime_description,
        anime_status,
        rating_mpaa,
        kinopoisk_rating,
        kinopoisk_votes,
        imdb_rating,
        shikimori_rating,
        shikimori_votes,
        anime_genres,
        anime_studios,
        countries,
        ..
    } = material;

    let row = AnimeRow {
        kodik_id: record.id,
        title: first_non_empty(record.title.as_deref(), anime_title.as_deref()),
        kinopoisk_id: record.kinopoisk_id,
        title_orig: record.title_orig,
        year: record.year,
        poster_url,
        player_link: record.link,
        description: first_non_empty(description.as_deref(), anime_description.as_deref()),
        kind: record.kind,
        status: anime_status,
        episodes_count: record.episodes_count,
        rating_mpaa,
        kinopoisk_rating,
        imdb_rating,
        shikimori_rating,
        kinopoisk_votes,
        shikimori_votes,
        screenshots: ScreenshotEnvelope {
            screenshots: record.screenshots.unwrap_or_default(),
        },
        updated_at_kodik,
        shikimori_id,
    };

    Ok(MappedRecord {
        row,
        relations: RelationNames {
            genres: anime_genres.unwrap_or_default(),
            studios: anime_studios.unwrap_or_default(),
            countries: countries.unwrap_or_default(),
        },
    })
}
