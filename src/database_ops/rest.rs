use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, ClientBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::database_ops::store::Store;

/// Error body PostgREST returns on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Supabase PostgREST backend (`{SUPABASE_URL}/rest/v1`), authenticated with the
/// service role key so row level security does not hide rows from the ingest.
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    http: Client,
}

impl RestStore {
    pub fn new(supabase_url: &str, service_role_key: &str) -> Result<Self> {
        Self::with_builder(supabase_url, service_role_key, Client::builder())
    }

    fn with_builder(
        supabase_url: &str,
        service_role_key: &str,
        builder: ClientBuilder,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_role_key)
            .context("service role key is not a valid header value")?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_role_key}"))
            .context("service role key is not a valid header value")?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = builder
            .user_agent("anime-catalog-ingest/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn post_upsert(
        &self,
        table: &str,
        row: &Value,
        conflict: &[&str],
        returning: bool,
    ) -> Result<Response> {
        let prefer = if returning {
            "resolution=merge-duplicates,return=representation"
        } else {
            "resolution=merge-duplicates,return=minimal"
        };
        let resp = self
            .http
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict.join(","))])
            .header("Prefer", prefer)
            .json(row)
            .send()
            .await
            .with_context(|| format!("upsert into {table}: request failed"))?;
        ensure_success(resp, table).await
    }
}

async fn ensure_success(resp: Response, table: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!(
        "{table}: PostgREST returned {status}: {}",
        describe_error_body(&body)
    ))
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => {
            let mut out = err.message.unwrap_or_else(|| "unknown error".into());
            if let Some(code) = err.code {
                out = format!("[{code}] {out}");
            }
            if let Some(details) = err.details.filter(|d| !d.is_empty()) {
                out.push_str(&format!(" ({details})"));
            }
            if let Some(hint) = err.hint.filter(|h| !h.is_empty()) {
                out.push_str(&format!(" hint: {hint}"));
            }
            out
        }
        Err(_) => body.chars().take(300).collect(),
    }
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<i64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.trim().parse::<i64>().ok()
}

#[async_trait::async_trait]
impl Store for RestStore {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn count(&self, table: &str) -> Result<i64> {
        let resp = self
            .http
            .head(self.table_url(table))
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .send()
            .await
            .with_context(|| format!("count {table}: request failed"))?;
        let resp = ensure_success(resp, table).await?;
        let header = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("count {table}: response has no Content-Range header"))?;
        let total = parse_content_range_total(header)
            .ok_or_else(|| anyhow!("count {table}: unexpected Content-Range '{header}'"))?;
        debug!(table, total, "counted rows");
        Ok(total)
    }

    async fn upsert(&self, table: &str, row: &Value, conflict: &[&str]) -> Result<()> {
        self.post_upsert(table, row, conflict, false).await?;
        Ok(())
    }

    async fn upsert_returning_id(
        &self,
        table: &str,
        row: &Value,
        conflict: &[&str],
    ) -> Result<i64> {
        let resp = self.post_upsert(table, row, conflict, true).await?;
        let rows: Vec<Value> = resp
            .json()
            .await
            .with_context(|| format!("upsert into {table}: undecodable representation"))?;
        let Some(first) = rows.first() else {
            bail!("upsert into {table}: no row returned");
        };
        first
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("upsert into {table}: returned row has no integer id"))
    }
}
