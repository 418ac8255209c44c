//! Core vault type definitions.
//!
//! Defines [`Category`] (the fixed classification of an entry), [`EntrySource`],
//! [`ContextEntry`] (a stored fact about the user), [`Relationship`] (edges between
//! entries) and [`CategoryScope`] (a caller's permission scope).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fixed classification of an entry's semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Personal,
    Preference,
    Goal,
    Relationship,
    Skill,
    Project,
    Note,
    Event,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Personal,
        Self::Preference,
        Self::Goal,
        Self::Relationship,
        Self::Skill,
        Self::Project,
        Self::Note,
        Self::Event,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Preference => "preference",
            Self::Goal => "goal",
            Self::Relationship => "relationship",
            Self::Skill => "skill",
            Self::Project => "project",
            Self::Note => "note",
            Self::Event => "event",
        }
    }

    /// Heading used when this category is injected into a prompt.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Personal => "About the user",
            Self::Preference => "Preferences",
            Self::Goal => "Goals",
            Self::Relationship => "Relationships",
            Self::Skill => "Skills",
            Self::Project => "Projects",
            Self::Note => "Notes",
            Self::Event => "Events",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// How an entry entered the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Learned,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Learned => "learned",
        }
    }
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntrySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "learned" => Ok(Self::Learned),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

/// A single stored fact, matching the `context_entries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub content: String,
    pub category: Category,
    pub tags: BTreeSet<String>,
    /// Confidence in `[0.0, 1.0]`. Learned entries start below the promotion threshold.
    pub confidence: f64,
    pub source: EntrySource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of times this entry was selected for injection.
    pub access_count: u32,
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// The entry that replaced this one. Once set, never cleared.
    pub superseded_by: Option<String>,
}

impl ContextEntry {
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// Input for inserting a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub content: String,
    pub category: Category,
    pub tags: BTreeSet<String>,
    pub confidence: f64,
    pub source: EntrySource,
}

/// Kind of a directed edge between two entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Related,
    Contradicts,
    Supports,
    Hierarchical,
    Temporal,
    Causal,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Contradicts => "contradicts",
            Self::Supports => "supports",
            Self::Hierarchical => "hierarchical",
            Self::Temporal => "temporal",
            Self::Causal => "causal",
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "related" => Ok(Self::Related),
            "contradicts" => Ok(Self::Contradicts),
            "supports" => Ok(Self::Supports),
            "hierarchical" => Ok(Self::Hierarchical),
            "temporal" => Ok(Self::Temporal),
            "causal" => Ok(Self::Causal),
            _ => Err(format!("unknown relationship kind: {s}")),
        }
    }
}

/// A directed edge between two entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: RelationshipKind,
    pub created_at: DateTime<Utc>,
}

/// The set of categories a caller model may receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "categories", rename_all = "snake_case")]
pub enum CategoryScope {
    AllowAll,
    DenyAll,
    Categories(BTreeSet<Category>),
}

impl CategoryScope {
    pub fn allows(&self, category: Category) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DenyAll => false,
            Self::Categories(set) => set.contains(&category),
        }
    }

    /// `true` if no category at all can pass.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::AllowAll => false,
            Self::DenyAll => true,
            Self::Categories(set) => set.is_empty(),
        }
    }
}

/// Filters for [`crate::vault::Vault::list_entries`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryFilter {
    pub category: Option<Category>,
    pub source: Option<EntrySource>,
    /// Only entries carrying this tag.
    pub tag: Option<String>,
    pub include_superseded: bool,
    pub limit: Option<usize>,
}
