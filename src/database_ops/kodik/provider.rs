use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{IngestConfig, ListQuery};
use crate::error::FetchError;

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Source of one page of raw catalog records.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Value>, FetchError>;
}

/// Kodik listing client.
/// Public API (base): https://kodikapi.com/
///
/// Only `GET /list` is used: one request, no paging, no retry.
#[derive(Debug, Clone)]
pub struct KodikProvider {
    base_url: String,
    http: Client,
    token: String,
}

impl KodikProvider {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_builder(base_url, token, Client::builder().timeout(timeout))
    }

    fn with_builder(
        base_url: &str,
        token: &str,
        builder: ClientBuilder,
    ) -> Result<Self, FetchError> {
        let http = builder.user_agent("anime-catalog-ingest/0.1").build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token: token.to_string(),
        })
    }

    pub fn from_config(cfg: &IngestConfig) -> Result<Self, FetchError> {
        Self::new(&cfg.kodik_api_url, &cfg.kodik_token, cfg.request_timeout)
    }

    fn list_params(&self, query: &ListQuery) -> Vec<(&'static str, String)> {
        vec![
            ("token", self.token.clone()),
            ("limit", query.limit.to_string()),
            ("types", query.types.join(",")),
            ("with_material_data", query.with_material_data.to_string()),
            ("sort", query.sort.clone()),
            ("order", query.order.clone()),
        ]
    }
}

#[async_trait::async_trait]
impl CatalogSource for KodikProvider {
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Value>, FetchError> {
        let url = format!("{}/list", self.base_url);
        info!(
            limit = query.limit,
            types = %query.types.join(","),
            sort = %query.sort,
            order = %query.order,
            "requesting catalog page"
        );
        let resp = self
            .http
            .get(&url)
            .query(&self.list_params(query))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: truncate_for_log(body, 300),
            });
        }
        let results = parse_list_body(&body)?;
        debug!(count = results.len(), "catalog page decoded");
        Ok(results)
    }
}

/// Extract the `results` array from a `/list` body. A missing or null key is an
/// empty page; a top-level `error` string is an upstream failure.
pub fn parse_list_body(body: &str) -> Result<Vec<Value>, FetchError> {
    let mut data: Value = serde_json::from_str(body)?;
    if let Some(err) = data.get("error").and_then(Value::as_str) {
        return Err(FetchError::Api(err.to_string()));
    }
    match data.get_mut("results").map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        _ => Ok(Vec::new()),
    }
}
