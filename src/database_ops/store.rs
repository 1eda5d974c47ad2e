use anyhow::Result;
use serde_json::Value;

pub const ANIMES_TABLE: &str = "animes";
pub const ANIME_RELATIONS_TABLE: &str = "anime_relations";

/// Table-oriented access to the destination datastore.
///
/// Rows are JSON objects whose keys are column names. Upserts insert the row
/// or update the existing row that matches on `conflict` columns; nothing is
/// ever deleted.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &'static str;

    /// Exact row count of `table`.
    async fn count(&self, table: &str) -> Result<i64>;

    /// Upsert without reading anything back.
    async fn upsert(&self, table: &str, row: &Value, conflict: &[&str]) -> Result<()>;

    /// Upsert and return the resulting row's `id`.
    async fn upsert_returning_id(&self, table: &str, row: &Value, conflict: &[&str])
        -> Result<i64>;
}
