//! Entry store: durable reads and writes of `context_entries` plus the audit log.
//!
//! The store is the sole owner of entries. Entries are never deleted here; the only
//! mutations after insertion are access tracking, reinforcement/promotion of
//! confidence, and setting `superseded_by` (see [`super::relations`]).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use crate::vault::types::{ContextEntry, EntryFilter, NewEntry};

const ENTRY_COLUMNS: &str = "id, content, category, tags, confidence, source, created_at, \
                             updated_at, access_count, last_accessed_at, superseded_by";

/// Format a timestamp for storage. Microsecond precision keeps string order equal to time order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The instant as it will read back from storage.
pub(crate) fn stored_ts(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_col<T: FromStr<Err = String>>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Map a row selected with [`ENTRY_COLUMNS`] into a [`ContextEntry`].
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ContextEntry> {
    let tags_json: String = row.get(3)?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let last_accessed: Option<String> = row.get(9)?;

    Ok(ContextEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        category: parse_col(2, &row.get::<_, String>(2)?)?,
        tags,
        confidence: row.get(4)?,
        source: parse_col(5, &row.get::<_, String>(5)?)?,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
        updated_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        access_count: row.get(8)?,
        last_accessed_at: last_accessed.as_deref().map(|s| parse_ts(9, s)).transpose()?,
        superseded_by: row.get(10)?,
    })
}

/// Insert a new entry and its `create` audit record in one transaction.
pub fn insert_entry(
    conn: &mut Connection,
    new: &NewEntry,
    now: DateTime<Utc>,
) -> Result<ContextEntry> {
    if new.content.trim().is_empty() {
        bail!("content must not be empty");
    }
    if !(0.0..=1.0).contains(&new.confidence) {
        bail!("confidence must be between 0.0 and 1.0, got {}", new.confidence);
    }

    let now = stored_ts(now);
    let id = uuid::Uuid::now_v7().to_string();
    let tags_json = serde_json::to_string(&new.tags)?;
    let stamp = format_ts(now);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO context_entries (id, content, category, tags, confidence, source, created_at, updated_at, access_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0)",
        params![
            id,
            new.content,
            new.category.as_str(),
            tags_json,
            new.confidence,
            new.source.as_str(),
            stamp,
        ],
    )?;
    write_audit_log(
        &tx,
        "create",
        &id,
        Some(&serde_json::json!({"source": new.source.as_str(), "confidence": new.confidence})),
        now,
    )?;
    tx.commit()?;

    Ok(ContextEntry {
        id,
        content: new.content.clone(),
        category: new.category,
        tags: new.tags.clone(),
        confidence: new.confidence,
        source: new.source,
        created_at: now,
        updated_at: now,
        access_count: 0,
        last_accessed_at: None,
        superseded_by: None,
    })
}

pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<ContextEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM context_entries WHERE id = ?1"),
            params![id],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Batch-fetch entries by id.
pub fn fetch_entries(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, ContextEntry>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM context_entries WHERE id IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(|e| (e.id.clone(), e)).collect())
}

/// List entries newest first.
pub fn list_entries(conn: &Connection, filter: &EntryFilter) -> Result<Vec<ContextEntry>> {
    let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM context_entries WHERE 1 = 1");
    let mut args: Vec<String> = Vec::new();

    if let Some(category) = filter.category {
        args.push(category.as_str().to_string());
        sql.push_str(&format!(" AND category = ?{}", args.len()));
    }
    if let Some(source) = filter.source {
        args.push(source.as_str().to_string());
        sql.push_str(&format!(" AND source = ?{}", args.len()));
    }
    if let Some(tag) = &filter.tag {
        args.push(tag.clone());
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(context_entries.tags) WHERE json_each.value = ?{})",
            args.len()
        ));
    }
    if !filter.include_superseded {
        sql.push_str(" AND superseded_by IS NULL");
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert an exported entry as-is, keeping its id, timestamps and counters.
///
/// `superseded_by` is left unset; see [`restore_superseded`]. Returns `false` if an
/// entry with the same id already exists.
pub fn restore_entry(conn: &Connection, entry: &ContextEntry, now: DateTime<Utc>) -> Result<bool> {
    if !(0.0..=1.0).contains(&entry.confidence) {
        bail!("entry {}: confidence out of range: {}", entry.id, entry.confidence);
    }
    let rows = conn.execute(
        "INSERT OR IGNORE INTO context_entries (id, content, category, tags, confidence, source, \
         created_at, updated_at, access_count, last_accessed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id,
            entry.content,
            entry.category.as_str(),
            serde_json::to_string(&entry.tags)?,
            entry.confidence,
            entry.source.as_str(),
            format_ts(entry.created_at),
            format_ts(entry.updated_at),
            entry.access_count,
            entry.last_accessed_at.map(format_ts),
        ],
    )?;
    if rows == 0 {
        return Ok(false);
    }
    write_audit_log(
        conn,
        "create",
        &entry.id,
        Some(&serde_json::json!({"source": entry.source.as_str(), "imported": true})),
        now,
    )?;
    Ok(true)
}

/// Re-apply an exported supersession mark. Existing marks are never overwritten.
pub fn restore_superseded(conn: &Connection, id: &str, winner: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE context_entries SET superseded_by = ?1 WHERE id = ?2 AND superseded_by IS NULL",
        params![winner, id],
    )?;
    Ok(rows > 0)
}

/// Every entry's id and content, for rebuilding the similarity index.
pub fn load_index_source(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT id, content FROM context_entries ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Increment `access_count` and stamp `last_accessed_at` for selected entries.
pub fn record_access(conn: &Connection, ids: &[&str], now: DateTime<Utc>) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let stamp = format_ts(stored_ts(now));
    let mut stmt = conn.prepare(
        "UPDATE context_entries SET access_count = access_count + 1, last_accessed_at = ?1 WHERE id = ?2",
    )?;
    for id in ids {
        stmt.execute(params![stamp, id])?;
    }
    Ok(())
}

/// Outcome of [`reinforce_entry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reinforcement {
    pub confidence: f64,
    /// The entry crossed the promotion threshold on this reinforcement.
    pub promoted: bool,
}

/// Raise an entry's confidence after it was observed again.
pub fn reinforce_entry(
    conn: &mut Connection,
    id: &str,
    step: f64,
    promotion_threshold: f64,
    now: DateTime<Utc>,
) -> Result<Reinforcement> {
    let now = stored_ts(now);
    let tx = conn.transaction()?;
    let before: f64 = tx
        .query_row(
            "SELECT confidence FROM context_entries WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .with_context(|| format!("entry not found: {id}"))?;
    let after = (before + step).min(1.0);

    tx.execute(
        "UPDATE context_entries SET confidence = ?1, updated_at = ?2 WHERE id = ?3",
        params![after, format_ts(now), id],
    )?;
    write_audit_log(
        &tx,
        "reinforce",
        id,
        Some(&serde_json::json!({"from": before, "to": after})),
        now,
    )?;

    let promoted = before < promotion_threshold && after >= promotion_threshold;
    if promoted {
        write_audit_log(&tx, "promote", id, Some(&serde_json::json!({"reason": "reinforced"})), now)?;
    }
    tx.commit()?;

    Ok(Reinforcement { confidence: after, promoted })
}

/// Manually validate an entry, lifting its confidence to at least `confidence`.
pub fn confirm_entry(
    conn: &mut Connection,
    id: &str,
    confidence: f64,
    now: DateTime<Utc>,
) -> Result<ContextEntry> {
    let now = stored_ts(now);
    let tx = conn.transaction()?;
    let rows = tx.execute(
        "UPDATE context_entries SET confidence = MAX(confidence, ?1), updated_at = ?2 WHERE id = ?3",
        params![confidence, format_ts(now), id],
    )?;
    if rows == 0 {
        bail!("entry not found: {id}");
    }
    write_audit_log(&tx, "promote", id, Some(&serde_json::json!({"reason": "confirmed"})), now)?;
    tx.commit()?;

    get_entry(conn, id)?.with_context(|| format!("entry not found: {id}"))
}

/// Write an entry to the `entry_log` audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    entry_id: &str,
    details: Option<&serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<()> {
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO entry_log (operation, entry_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, entry_id, details_json, format_ts(now)],
    )?;
    Ok(())
}
