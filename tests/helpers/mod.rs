#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use contextvault::config::VaultConfig;
use contextvault::db;
use contextvault::similarity::lexical::LexicalIndex;
use contextvault::similarity::{SimilarityHit, SimilarityIndex};
use contextvault::vault::store::insert_entry;
use contextvault::vault::types::{Category, ContextEntry, EntrySource, NewEntry};
use contextvault::vault::{AddEntry, Vault};
use rusqlite::Connection;

/// A vault over an in-memory database with the lexical index and default config.
pub fn test_vault() -> Vault {
    test_vault_with(VaultConfig::default())
}

pub fn test_vault_with(config: VaultConfig) -> Vault {
    let conn = db::open_memory_database().unwrap();
    Vault::with_parts(conn, Arc::new(LexicalIndex::new()), Arc::new(config)).unwrap()
}

/// Manually add an entry, letting the vault classify it.
pub fn add(vault: &Vault, content: &str) -> ContextEntry {
    vault
        .add_entry(AddEntry {
            content: content.into(),
            ..Default::default()
        })
        .unwrap()
        .entry
}

pub fn add_as(vault: &Vault, content: &str, category: Category, confidence: f64) -> ContextEntry {
    vault
        .add_entry(AddEntry {
            content: content.into(),
            category: Some(category),
            confidence: Some(confidence),
            ..Default::default()
        })
        .unwrap()
        .entry
}

/// An entry to write straight to the store with a chosen age.
pub struct Seed {
    pub content: &'static str,
    pub category: Category,
    pub confidence: f64,
    pub age_days: i64,
}

impl Seed {
    pub fn new(content: &'static str, category: Category) -> Self {
        Self {
            content,
            category,
            confidence: 1.0,
            age_days: 0,
        }
    }

    pub fn aged(mut self, days: i64) -> Self {
        self.age_days = days;
        self
    }
}

/// Write entries directly (no dedup or conflict pass), then open a vault over them.
/// Returned entries are in seed order.
pub fn seeded_vault(config: VaultConfig, seeds: &[Seed]) -> (Vault, Vec<ContextEntry>) {
    let mut conn = db::open_memory_database().unwrap();
    let entries = seed_entries(&mut conn, seeds);
    let vault = Vault::with_parts(conn, Arc::new(LexicalIndex::new()), Arc::new(config)).unwrap();
    (vault, entries)
}

pub fn seed_entries(conn: &mut Connection, seeds: &[Seed]) -> Vec<ContextEntry> {
    seeds
        .iter()
        .map(|seed| {
            insert_entry(
                conn,
                &NewEntry {
                    content: seed.content.into(),
                    category: seed.category,
                    tags: Default::default(),
                    confidence: seed.confidence,
                    source: EntrySource::Manual,
                },
                Utc::now() - Duration::days(seed.age_days),
            )
            .unwrap()
        })
        .collect()
}

/// An index that accepts writes but cannot answer queries.
pub struct BrokenIndex;

impl SimilarityIndex for BrokenIndex {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn upsert(&self, _id: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn query(&self, _text: &str, _limit: usize) -> anyhow::Result<Vec<SimilarityHit>> {
        anyhow::bail!("index offline")
    }

    fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }
}
