use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::types::Json;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::database_ops::store::Store;

/// Direct Postgres backend for the Supabase database. Rows are handed to the
/// server as one `jsonb` parameter and expanded with `jsonb_populate_record`,
/// so column types come from the table definition, not from the client.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    // never record the DSN in spans; it carries credentials
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_conns: u32) -> Result<Self> {
        // Supabase poolers reject named prepared statements in transaction mode.
        let mut connect_options =
            PgConnectOptions::from_str(database_url)?.statement_cache_capacity(0);
        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }
        let pool = PgPoolOptions::new()
            .max_connections(max_conns)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options)
            .await
            .context("connecting to Postgres")?;
        info!("connected to db");
        Ok(Self { pool })
    }
}

fn is_safe_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn quote_ident(ident: &str) -> Result<String> {
    if !is_safe_ident(ident) {
        bail!("refusing unsafe SQL identifier '{ident}'");
    }
    Ok(format!("\"{ident}\""))
}

/// Build `INSERT ... ON CONFLICT` for the given row shape. `$1` is the row as jsonb.
fn build_upsert_sql(
    table: &str,
    row: &Value,
    conflict: &[&str],
    returning: bool,
) -> Result<String> {
    let obj = row
        .as_object()
        .ok_or_else(|| anyhow!("{table}: row must be a JSON object"))?;
    if conflict.is_empty() {
        bail!("{table}: at least one conflict column is required");
    }
    for key in conflict {
        if !obj.contains_key(*key) {
            bail!("{table}: conflict column '{key}' missing from row");
        }
    }

    let table_q = quote_ident(table)?;
    let cols = obj
        .keys()
        .map(|k| quote_ident(k))
        .collect::<Result<Vec<_>>>()?;
    let col_list = cols.join(", ");
    let conflict_list = conflict
        .iter()
        .map(|k| quote_ident(k))
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    let updates: Vec<String> = obj
        .keys()
        .filter(|k| !conflict.contains(&k.as_str()))
        .map(|k| format!("\"{k}\" = EXCLUDED.\"{k}\""))
        .collect();

    let action = match (updates.is_empty(), returning) {
        (false, _) => format!("DO UPDATE SET {}", updates.join(", ")),
        // RETURNING only yields conflicting rows when they are touched
        (true, true) => {
            let key = quote_ident(conflict[0])?;
            format!("DO UPDATE SET {key} = EXCLUDED.{key}")
        }
        (true, false) => "DO NOTHING".to_string(),
    };

    let mut sql = format!(
        "INSERT INTO {table_q} ({col_list}) SELECT {col_list} \
         FROM jsonb_populate_record(NULL::{table_q}, $1::jsonb) \
         ON CONFLICT ({conflict_list}) {action}"
    );
    if returning {
        sql.push_str(" RETURNING id::bigint");
    }
    Ok(sql)
}

#[async_trait::async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table)?);
        let total: i64 = sqlx::query_scalar(&sql)
            .persistent(false)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("count {table}"))?;
        debug!(table, total, "counted rows");
        Ok(total)
    }

    async fn upsert(&self, table: &str, row: &Value, conflict: &[&str]) -> Result<()> {
        let sql = build_upsert_sql(table, row, conflict, false)?;
        sqlx::query(&sql)
            .persistent(false)
            .bind(Json(row))
            .execute(&self.pool)
            .await
            .with_context(|| format!("upsert into {table}"))?;
        Ok(())
    }

    async fn upsert_returning_id(
        &self,
        table: &str,
        row: &Value,
        conflict: &[&str],
    ) -> Result<i64> {
        let sql = build_upsert_sql(table, row, conflict, true)?;
        let id: i64 = sqlx::query_scalar(&sql)
            .persistent(false)
            .bind(Json(row))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("upsert into {table}"))?;
        Ok(id)
    }
}
