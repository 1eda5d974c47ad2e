//! In-process `Store` that honours conflict keys, used by the tests.
use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::database_ops::store::Store;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Table>>,
    writes: Mutex<Vec<String>>,
    fail_counts: bool,
    fail_tables: HashSet<String>,
    fail_values: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `count` call errors, as if the store were unreachable.
    pub fn unreachable() -> Self {
        Self {
            fail_counts: true,
            ..Self::default()
        }
    }

    /// Upserts into `table` error.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.fail_tables.insert(table.to_string());
        self
    }

    /// Upserts of rows whose `name` equals `value` error.
    pub fn failing_name(mut self, value: &str) -> Self {
        self.fail_values.insert(value.to_string());
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Map<String, Value>> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Tables written to, one entry per upsert attempt that reached the store.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn apply(&self, table: &str, row: &Value, conflict: &[&str]) -> Result<i64> {
        self.writes.lock().unwrap().push(table.to_string());
        if self.fail_tables.contains(table) {
            bail!("{table}: simulated failure");
        }
        let obj = row
            .as_object()
            .ok_or_else(|| anyhow!("{table}: row must be an object"))?;
        if let Some(name) = obj.get("name").and_then(Value::as_str) {
            if self.fail_values.contains(name) {
                bail!("{table}: simulated failure for '{name}'");
            }
        }

        let mut tables = self.tables.lock().unwrap();
        let t = tables.entry(table.to_string()).or_default();
        let existing = t
            .rows
            .iter_mut()
            .find(|r| conflict.iter().all(|k| r.get(*k) == obj.get(*k)));
        match existing {
            Some(current) => {
                for (k, v) in obj {
                    current.insert(k.clone(), v.clone());
                }
                current
                    .get("id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| anyhow!("{table}: stored row lost its id"))
            }
            None => {
                t.next_id += 1;
                let mut stored = obj.clone();
                stored.insert("id".into(), Value::from(t.next_id));
                t.rows.push(stored);
                Ok(t.next_id)
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, table: &str) -> Result<i64> {
        if self.fail_counts {
            bail!("connection refused");
        }
        Ok(self.rows(table).len() as i64)
    }

    async fn upsert(&self, table: &str, row: &Value, conflict: &[&str]) -> Result<()> {
        self.apply(table, row, conflict).map(|_| ())
    }

    async fn upsert_returning_id(
        &self,
        table: &str,
        row: &Value,
        conflict: &[&str],
    ) -> Result<i64> {
        self.apply(table, row, conflict)
    }
}
