use std::str::FromStr;
use std::time::Duration;

use crate::error::IngestError;
use crate::util::env as env_util;

pub const DEFAULT_SUPABASE_URL: &str = "https://your-project-url.supabase.co";
pub const DEFAULT_SERVICE_ROLE_KEY: &str = "your-service-role-key";
pub const DEFAULT_KODIK_TOKEN: &str = "your-kodik-api-token";
pub const DEFAULT_KODIK_API_URL: &str = "https://kodikapi.com";

/// Which destination backend the sink talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Supabase PostgREST over HTTPS (service role key).
    Rest,
    /// Direct Postgres connection to the Supabase database.
    Postgres { database_url: String },
}

/// Listing request parameters sent to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub types: Vec<String>,
    pub sort: String,
    pub order: String,
    pub with_material_data: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            types: vec!["anime".to_string(), "anime-serial".to_string()],
            sort: "shikimori_rating".to_string(),
            order: "desc".to_string(),
            with_material_data: true,
        }
    }
}

/// Everything the ingest run needs, resolved once at process start.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub supabase_url: String,
    pub service_role_key: String,
    pub kodik_token: String,
    pub kodik_api_url: String,
    pub query: ListQuery,
    pub request_timeout: Duration,
    pub record_delay: Duration,
    pub normalize_poster_urls: bool,
    pub backend: StoreBackend,
}

impl IngestConfig {
    /// Read configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self, IngestError> {
        env_util::init_env();
        Self::from_lookup(env_util::env_opt)
    }

    /// Build configuration from an arbitrary key lookup. Unset or blank keys fall
    /// back to the literal defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let defaults = ListQuery::default();
        let types = get("KODIK_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.types);

        let query = ListQuery {
            limit: parse_or(&get, "KODIK_LIMIT", defaults.limit)?,
            types,
            sort: get_or("KODIK_SORT", &defaults.sort),
            order: get_or("KODIK_ORDER", &defaults.order),
            with_material_data: true,
        };
        if query.limit == 0 {
            return Err(IngestError::Config("KODIK_LIMIT must be at least 1".into()));
        }

        let backend = match get_or("STORE_BACKEND", "rest").trim().to_ascii_lowercase().as_str()
        {
            "rest" | "postgrest" => StoreBackend::Rest,
            "postgres" | "pg" => {
                let database_url = get("SUPABASE_DB_URL")
                    .or_else(|| get("DATABASE_URL"))
                    .ok_or_else(|| {
                        IngestError::Config(
                            "STORE_BACKEND=postgres requires SUPABASE_DB_URL or DATABASE_URL"
                                .into(),
                        )
                    })?;
                StoreBackend::Postgres { database_url }
            }
            other => {
                return Err(IngestError::Config(format!(
                    "unknown STORE_BACKEND '{other}' (expected rest or postgres)"
                )))
            }
        };

        Ok(Self {
            supabase_url: get_or("SUPABASE_URL", DEFAULT_SUPABASE_URL)
                .trim_end_matches('/')
                .to_string(),
            service_role_key: get_or("SUPABASE_SERVICE_ROLE_KEY", DEFAULT_SERVICE_ROLE_KEY),
            kodik_token: get_or("KODIK_API_TOKEN", DEFAULT_KODIK_TOKEN),
            kodik_api_url: get_or("KODIK_API_URL", DEFAULT_KODIK_API_URL)
                .trim_end_matches('/')
                .to_string(),
            query,
            request_timeout: Duration::from_secs(parse_or(&get, "KODIK_TIMEOUT_SECS", 30u64)?),
            record_delay: Duration::from_millis(parse_or(&get, "INGEST_DELAY_MS", 500u64)?),
            normalize_poster_urls: get("NORMALIZE_POSTER_URLS")
                .map(|v| env_util::parse_flag(&v))
                .unwrap_or(false),
            backend,
        })
    }

    /// Log which settings are in effect without leaking credentials.
    pub fn log_snapshot(&self) {
        let set_or_default = |value: &str, default: &str| {
            if value == default {
                "default (not set)".to_string()
            } else {
                "set".to_string()
            }
        };
        let backend = match &self.backend {
            StoreBackend::Rest => "rest".to_string(),
            StoreBackend::Postgres { database_url } => {
                format!("postgres {}", env_util::redact_value("DSN", database_url))
            }
        };
        env_util::log_snapshot(
            "anime-catalog-ingest",
            &[
                ("SUPABASE_URL", self.supabase_url.clone()),
                (
                    "service_role",
                    set_or_default(&self.service_role_key, DEFAULT_SERVICE_ROLE_KEY),
                ),
                (
                    "kodik_access",
                    set_or_default(&self.kodik_token, DEFAULT_KODIK_TOKEN),
                ),
                ("KODIK_API_URL", self.kodik_api_url.clone()),
                ("KODIK_LIMIT", self.query.limit.to_string()),
                ("KODIK_TYPES", self.query.types.join(",")),
                ("STORE_BACKEND", backend),
            ],
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, IngestError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| IngestError::Config(format!("{key}: cannot parse '{raw}'"))),
        None => Ok(default),
    }
}
