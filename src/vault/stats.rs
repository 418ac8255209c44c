use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::vault::types::{Category, EntrySource};

#[derive(Debug, Serialize)]
pub struct VaultStats {
    pub total_entries: u64,
    pub active_entries: u64,
    pub superseded_entries: u64,
    pub by_category: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    pub relationships: u64,
    pub contradictions: u64,
    pub audit_log_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<String>,
}

/// Compute vault statistics. `db_path` is only used for the file size.
pub fn vault_stats(conn: &Connection, db_path: Option<&Path>) -> Result<VaultStats> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    let total = count("SELECT COUNT(*) FROM context_entries")?;
    let active = count("SELECT COUNT(*) FROM context_entries WHERE superseded_by IS NULL")?;

    let mut by_category: BTreeMap<String, u64> =
        Category::ALL.iter().map(|c| (c.as_str().to_string(), 0)).collect();
    by_category.extend(group_counts(conn, "category")?);

    let mut by_source: BTreeMap<String, u64> = [EntrySource::Manual, EntrySource::Learned]
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    by_source.extend(group_counts(conn, "source")?);

    let (oldest_entry, newest_entry): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM context_entries",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(VaultStats {
        total_entries: total,
        active_entries: active,
        superseded_entries: total - active,
        by_category,
        by_source,
        relationships: count("SELECT COUNT(*) FROM context_relationships")?,
        contradictions: count(
            "SELECT COUNT(*) FROM context_relationships WHERE kind = 'contradicts'",
        )?,
        audit_log_entries: count("SELECT COUNT(*) FROM entry_log")?,
        db_size_bytes,
        oldest_entry,
        newest_entry,
    })
}

/// Active-entry counts grouped by a column.
fn group_counts(conn: &Connection, column: &str) -> Result<Vec<(String, u64)>> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM context_entries WHERE superseded_by IS NULL GROUP BY {column}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
