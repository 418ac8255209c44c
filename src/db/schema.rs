//! SQL DDL for all vault tables.
//!
//! Defines `context_entries`, `context_relationships`, `permissions`,
//! `entry_log` and `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS context_entries (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    category TEXT NOT NULL CHECK(category IN ('personal','preference','goal','relationship','skill','project','note','event')),
    tags TEXT NOT NULL DEFAULT '[]',
    confidence REAL NOT NULL CHECK(confidence >= 0.0 AND confidence <= 1.0),
    source TEXT NOT NULL CHECK(source IN ('manual','learned')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT,
    superseded_by TEXT REFERENCES context_entries(id)
);

CREATE INDEX IF NOT EXISTS idx_entries_category ON context_entries(category);
CREATE INDEX IF NOT EXISTS idx_entries_source ON context_entries(source);
CREATE INDEX IF NOT EXISTS idx_entries_superseded ON context_entries(superseded_by);

CREATE TABLE IF NOT EXISTS context_relationships (
    id TEXT PRIMARY KEY,
    from_id TEXT NOT NULL REFERENCES context_entries(id),
    to_id TEXT NOT NULL REFERENCES context_entries(id),
    kind TEXT NOT NULL CHECK(kind IN ('related','contradicts','supports','hierarchical','temporal','causal')),
    created_at TEXT NOT NULL,
    CHECK(from_id <> to_id)
);

CREATE INDEX IF NOT EXISTS idx_relationships_from ON context_relationships(from_id);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON context_relationships(to_id);

-- At most one contradicts edge per unordered pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_relationships_contradiction_pair
    ON context_relationships(min(from_id, to_id), max(from_id, to_id))
    WHERE kind = 'contradicts';

CREATE TABLE IF NOT EXISTS permissions (
    model_id TEXT PRIMARY KEY,
    mode TEXT NOT NULL CHECK(mode IN ('allow_all','deny_all','categories')),
    categories TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);

-- Audit log
CREATE TABLE IF NOT EXISTS entry_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','reinforce','promote','supersede')),
    entry_id TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "context_entries",
            "context_relationships",
            "permissions",
            "entry_log",
            "schema_meta",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn contradiction_pair_is_unique_in_either_direction() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        for id in ["a", "b"] {
            conn.execute(
                "INSERT INTO context_entries (id, content, category, confidence, source, created_at, updated_at) \
                 VALUES (?1, 'x', 'note', 1.0, 'manual', 't', 't')",
                [id],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO context_relationships (id, from_id, to_id, kind, created_at) VALUES ('r1','a','b','contradicts','t')",
            [],
        )
        .unwrap();
        let reversed = conn.execute(
            "INSERT INTO context_relationships (id, from_id, to_id, kind, created_at) VALUES ('r2','b','a','contradicts','t')",
            [],
        );
        assert!(reversed.is_err());

        // other kinds are not constrained
        conn.execute(
            "INSERT INTO context_relationships (id, from_id, to_id, kind, created_at) VALUES ('r3','b','a','related','t')",
            [],
        )
        .unwrap();
    }
}
