use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry of the `/list` response `results` array. Only the fields the
/// ingest maps are declared; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KodikRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub shikimori_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub kinopoisk_id: Option<String>,
    pub title: Option<String>,
    pub title_orig: Option<String>,
    pub year: Option<i32>,
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub episodes_count: Option<i32>,
    pub updated_at: Option<String>,
    pub screenshots: Option<Vec<String>>,
    pub material_data: Option<MaterialData>,
}

/// Nested `material_data` object returned with `with_material_data=true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialData {
    pub anime_title: Option<String>,
    pub poster_url: Option<String>,
    pub anime_poster_url: Option<String>,
    pub description: Option<String>,
    pub anime_description: Option<String>,
    pub anime_status: Option<String>,
    pub rating_mpaa: Option<String>,
    pub kinopoisk_rating: Option<f64>,
    pub kinopoisk_votes: Option<i64>,
    pub imdb_rating: Option<f64>,
    pub shikimori_rating: Option<f64>,
    pub shikimori_votes: Option<i64>,
    #[serde(default, deserialize_with = "names_with_holes")]
    pub anime_genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "names_with_holes")]
    pub anime_studios: Option<Vec<String>>,
    #[serde(default, deserialize_with = "names_with_holes")]
    pub countries: Option<Vec<String>>,
}

/// Kodik is inconsistent about id types (`"5114"` vs `5114`); accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `null` entries in a name list are kept as blank names.
fn names_with_holes<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(items.map(|names| names.into_iter().map(Option::unwrap_or_default).collect()))
}
