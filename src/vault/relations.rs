//! Relationship edges and supersession.
//!
//! A `contradicts` edge and the `superseded_by` mark it causes are always written in the
//! same transaction, so the graph never holds a contradiction with zero or two losers.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::vault::store::{format_ts, stored_ts, write_audit_log};
use crate::vault::types::{Relationship, RelationshipKind};

pub fn insert_relationship(
    conn: &Connection,
    from_id: &str,
    to_id: &str,
    kind: RelationshipKind,
    now: DateTime<Utc>,
) -> Result<Relationship> {
    if from_id == to_id {
        bail!("an entry cannot relate to itself: {from_id}");
    }
    let now = stored_ts(now);
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO context_relationships (id, from_id, to_id, kind, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, from_id, to_id, kind.as_str(), format_ts(now)],
    )?;
    Ok(Relationship {
        id,
        from_id: from_id.to_string(),
        to_id: to_id.to_string(),
        kind,
        created_at: now,
    })
}

/// `true` if a `contradicts` edge links the pair in either direction.
pub fn contradiction_exists(conn: &Connection, a: &str, b: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM context_relationships \
         WHERE kind = 'contradicts' AND ((from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1))",
        params![a, b],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Mark `loser` as superseded by `winner`. Returns `false` if `loser` was already
/// superseded; an existing mark is never overwritten.
pub fn set_superseded(
    conn: &Connection,
    loser: &str,
    winner: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE context_entries SET superseded_by = ?1 WHERE id = ?2 AND superseded_by IS NULL",
        params![winner, loser],
    )?;
    if rows == 0 {
        return Ok(false);
    }
    write_audit_log(
        conn,
        "supersede",
        loser,
        Some(&serde_json::json!({"superseded_by": winner})),
        now,
    )?;
    Ok(true)
}

const RELATIONSHIP_COLUMNS: &str = "id, from_id, to_id, kind, created_at";

fn collect_relationships(
    stmt: &mut rusqlite::Statement<'_>,
    args: impl rusqlite::Params,
) -> Result<Vec<Relationship>> {
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, from_id, to_id, kind, created_at)| {
            Ok(Relationship {
                id,
                from_id,
                to_id,
                kind: kind.parse().map_err(anyhow::Error::msg)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
            })
        })
        .collect()
}

/// Every edge touching an entry, oldest first.
pub fn relationships_for(conn: &Connection, id: &str) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM context_relationships \
         WHERE from_id = ?1 OR to_id = ?1 ORDER BY created_at, id"
    ))?;
    collect_relationships(&mut stmt, params![id])
}

/// Every edge in the vault, oldest first.
pub fn list_relationships(conn: &Connection) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM context_relationships ORDER BY created_at, id"
    ))?;
    collect_relationships(&mut stmt, [])
}

/// Insert an exported edge with its original id. Returns `false` if the edge (or a
/// `contradicts` edge for the same pair) already exists.
pub fn restore_relationship(conn: &Connection, edge: &Relationship) -> Result<bool> {
    if edge.from_id == edge.to_id {
        bail!("an entry cannot relate to itself: {}", edge.from_id);
    }
    let rows = conn.execute(
        "INSERT OR IGNORE INTO context_relationships (id, from_id, to_id, kind, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            edge.id,
            edge.from_id,
            edge.to_id,
            edge.kind.as_str(),
            format_ts(edge.created_at)
        ],
    )?;
    Ok(rows > 0)
}
