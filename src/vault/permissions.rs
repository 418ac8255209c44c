//! Per-model category scopes.
//!
//! Lookup for a caller model id tries the exact id, then the id without its `:tag`
//! suffix, then the `*` wildcard. No record means [`CategoryScope::DenyAll`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::vault::store::format_ts;
use crate::vault::types::{Category, CategoryScope};

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Serialize)]
pub struct PermissionRecord {
    pub model_id: String,
    #[serde(flatten)]
    pub scope: CategoryScope,
    pub updated_at: String,
}

fn scope_to_row(scope: &CategoryScope) -> Result<(&'static str, String)> {
    Ok(match scope {
        CategoryScope::AllowAll => ("allow_all", "[]".to_string()),
        CategoryScope::DenyAll => ("deny_all", "[]".to_string()),
        CategoryScope::Categories(set) => ("categories", serde_json::to_string(set)?),
    })
}

fn scope_from_row(mode: &str, categories: &str) -> Result<CategoryScope> {
    match mode {
        "allow_all" => Ok(CategoryScope::AllowAll),
        "deny_all" => Ok(CategoryScope::DenyAll),
        "categories" => {
            let set: BTreeSet<Category> = serde_json::from_str(categories)
                .with_context(|| format!("invalid category list: {categories}"))?;
            Ok(CategoryScope::Categories(set))
        }
        other => anyhow::bail!("unknown permission mode: {other}"),
    }
}

/// Create or replace the scope for a model id (or `*`).
pub fn set_permission(
    conn: &Connection,
    model_id: &str,
    scope: &CategoryScope,
    now: DateTime<Utc>,
) -> Result<()> {
    let (mode, categories) = scope_to_row(scope)?;
    conn.execute(
        "INSERT INTO permissions (model_id, mode, categories, updated_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(model_id) DO UPDATE SET mode = excluded.mode, categories = excluded.categories, \
         updated_at = excluded.updated_at",
        params![model_id, mode, categories, format_ts(now)],
    )?;
    Ok(())
}

/// The record stored under exactly this id.
pub fn get_permission(conn: &Connection, model_id: &str) -> Result<Option<CategoryScope>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT mode, categories FROM permissions WHERE model_id = ?1",
            params![model_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    row.map(|(mode, categories)| scope_from_row(&mode, &categories))
        .transpose()
}

pub fn list_permissions(conn: &Connection) -> Result<Vec<PermissionRecord>> {
    let mut stmt =
        conn.prepare("SELECT model_id, mode, categories, updated_at FROM permissions ORDER BY model_id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(model_id, mode, categories, updated_at)| {
            Ok(PermissionRecord {
                model_id,
                scope: scope_from_row(&mode, &categories)?,
                updated_at,
            })
        })
        .collect()
}

/// Effective scope for a caller.
pub fn resolve_scope(conn: &Connection, model_id: &str) -> Result<CategoryScope> {
    if let Some(scope) = get_permission(conn, model_id)? {
        return Ok(scope);
    }
    if let Some((base, _tag)) = model_id.split_once(':') {
        if let Some(scope) = get_permission(conn, base)? {
            return Ok(scope);
        }
    }
    Ok(get_permission(conn, WILDCARD)?.unwrap_or(CategoryScope::DenyAll))
}
