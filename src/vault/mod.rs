//! The context vault: entry store, similarity index and the engines built on them.
//!
//! [`Vault`] is the single entry point used by the proxy and the CLI. All methods are
//! synchronous; async callers run them under `tokio::task::spawn_blocking`.
//!
//! Writes (manual adds and learned entries) are serialized by a write gate and follow
//! write-ahead order: durable insert, then index upsert, then conflict resolution.
//! Reads take the database lock only for the duration of each query, so retrieval is
//! never blocked behind a whole learning pass.

pub mod conflict;
pub mod injector;
pub mod learner;
pub mod permissions;
pub mod relations;
pub mod rules;
pub mod scorer;
pub mod stats;
pub mod store;
pub mod types;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::db::{self, HealthReport};
use crate::error::VaultError;
use crate::similarity::{self, SimilarityIndex};
use injector::RenderedContext;
use permissions::PermissionRecord;
use scorer::ScoredCandidate;
use stats::VaultStats;
use types::{
    Category, CategoryScope, ContextEntry, EntryFilter, EntrySource, NewEntry, Relationship,
};

/// Input for [`Vault::add_entry`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddEntry {
    pub content: String,
    /// Classified from the content when absent.
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub entry: ContextEntry,
    /// `contradicts` edges created while resolving the new entry.
    pub relationships: Vec<Relationship>,
    /// `true` if an equivalent active entry already existed and was returned instead.
    pub deduplicated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: ContextEntry,
    pub similarity: f64,
}

/// Selected entries and the prefix rendered from them.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub selected: Vec<ScoredCandidate>,
    pub context: RenderedContext,
}

impl Retrieval {
    fn empty() -> Self {
        Self {
            selected: Vec::new(),
            context: injector::render(&[], 0, crate::config::BudgetUnit::Chars),
        }
    }
}

/// Version written to [`VaultExport::version`].
pub const EXPORT_VERSION: u32 = 1;

/// A model's scope as written to an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPermission {
    pub model_id: String,
    pub scope: CategoryScope,
}

/// Full vault contents: entries (superseded ones included), edges and permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<ContextEntry>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub permissions: Vec<ExportedPermission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub entries_imported: usize,
    pub entries_skipped: usize,
    pub relationships_imported: usize,
    pub relationships_skipped: usize,
    pub permissions_imported: usize,
}

#[derive(Debug, Serialize)]
pub struct VaultHealth {
    pub status: &'static str,
    pub database: HealthReport,
    pub index_backend: &'static str,
    pub indexed_entries: usize,
    pub stats: VaultStats,
}

/// Nearest stored entries to `text` that pass `keep`, best first, at most `want`.
///
/// The index covers every category and still holds superseded entries, so the query
/// widens until `want` entries pass `keep` or no hit at or above `floor` is left.
pub(crate) fn nearest(
    conn: &Connection,
    index: &dyn SimilarityIndex,
    text: &str,
    want: usize,
    floor: f64,
    keep: impl Fn(&ContextEntry, f64) -> bool,
) -> anyhow::Result<Vec<(ContextEntry, f64)>> {
    if want == 0 {
        return Ok(Vec::new());
    }
    let total = index.len();
    let mut limit = want;
    loop {
        let hits = index.query(text, limit)?;
        let exhausted = hits.len() < limit
            || limit >= total
            || hits.last().map_or(true, |h| h.similarity < floor);

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        let mut entries = store::fetch_entries(conn, &ids)?;
        let kept: Vec<(ContextEntry, f64)> = hits
            .iter()
            .filter_map(|h| entries.remove(&h.id).map(|e| (e, h.similarity)))
            .filter(|(e, similarity)| keep(e, *similarity))
            .take(want)
            .collect();

        if kept.len() >= want || exhausted {
            return Ok(kept);
        }
        limit = limit.saturating_mul(4);
    }
}

pub struct Vault {
    db: Mutex<Connection>,
    index: Arc<dyn SimilarityIndex>,
    write_gate: Mutex<()>,
    config: Arc<VaultConfig>,
    db_path: Option<PathBuf>,
}

impl Vault {
    /// Open the configured database, build the configured index and load it from the store.
    pub fn open(config: Arc<VaultConfig>) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        let index = similarity::create_index(&config.similarity)?;

        let mut vault = Self::with_parts(conn, index, config)?;
        vault.db_path = Some(db_path);
        Ok(vault)
    }

    /// Assemble a vault from an open connection and an index, then rebuild the index.
    pub fn with_parts(
        conn: Connection,
        index: Arc<dyn SimilarityIndex>,
        config: Arc<VaultConfig>,
    ) -> anyhow::Result<Self> {
        if let Ok(Some(previous)) = db::migrations::get_index_backend(&conn) {
            if previous != index.name() {
                info!(previous = %previous, current = index.name(), "similarity backend changed");
            }
        }
        db::migrations::set_index_backend(&conn, index.name())?;

        let vault = Self {
            db: Mutex::new(conn),
            index,
            write_gate: Mutex::new(()),
            config,
            db_path: None,
        };
        vault.rebuild_index()?;
        Ok(vault)
    }

    pub fn config(&self) -> &Arc<VaultConfig> {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn SimilarityIndex> {
        &self.index
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| anyhow!("db lock poisoned: {e}"))
    }

    fn gate(&self) -> anyhow::Result<MutexGuard<'_, ()>> {
        self.write_gate
            .lock()
            .map_err(|e| anyhow!("write gate poisoned: {e}"))
    }

    /// Reload the index from every stored entry. Returns the number of entries indexed.
    pub fn rebuild_index(&self) -> anyhow::Result<usize> {
        let _gate = self.gate()?;
        let docs = store::load_index_source(&*self.conn()?)?;
        self.index.clear()?;
        self.index.upsert_batch(&docs)?;
        info!(entries = docs.len(), backend = self.index.name(), "similarity index built");
        Ok(docs.len())
    }

    /// Insert, index, then resolve conflicts. The caller holds the write gate.
    fn persist(&self, new: NewEntry) -> anyhow::Result<(ContextEntry, Vec<Relationship>)> {
        let now = Utc::now();
        let entry = store::insert_entry(&mut *self.conn()?, &new, now)?;

        if let Err(e) = self.index.upsert(&entry.id, &entry.content) {
            warn!(entry = %entry.id, error = %e, "index upsert failed; entry kept, conflicts unresolved");
            return Ok((entry, Vec::new()));
        }

        let resolved = {
            let mut conn = self.conn()?;
            conflict::check_and_resolve(
                &mut conn,
                self.index.as_ref(),
                &self.config.conflict,
                &entry,
                now,
            )
        };
        match resolved {
            Ok(edges) if edges.is_empty() => Ok((entry, edges)),
            Ok(edges) => {
                let refreshed = store::get_entry(&*self.conn()?, &entry.id)?.unwrap_or(entry);
                Ok((refreshed, edges))
            }
            Err(source) => {
                let err = VaultError::ConflictResolutionFailure {
                    entry_id: entry.id.clone(),
                    source,
                };
                warn!(error = %err, "entry kept unresolved");
                Ok((entry, Vec::new()))
            }
        }
    }

    /// Active entry in the same category whose text is near-identical, if any.
    fn find_duplicate(&self, content: &str, category: Category) -> anyhow::Result<Option<ContextEntry>> {
        let threshold = self.config.learning.dedup_threshold;
        let found = nearest(&*self.conn()?, self.index.as_ref(), content, 1, threshold, |e, sim| {
            sim >= threshold && e.is_active() && e.category == category
        })?;
        Ok(found.into_iter().next().map(|(entry, _)| entry))
    }

    /// Manually add an entry.
    pub fn add_entry(&self, req: AddEntry) -> Result<AddOutcome, VaultError> {
        let content = req.content.trim().to_string();
        if content.is_empty() {
            return Err(VaultError::InvalidInput("content must not be empty".into()));
        }
        let confidence = req
            .confidence
            .unwrap_or(self.config.learning.manual_confidence);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(VaultError::InvalidInput(format!(
                "confidence must be between 0.0 and 1.0, got {confidence}"
            )));
        }
        let category = req.category.unwrap_or_else(|| rules::categorize(&content));
        let tags = if req.tags.is_empty() {
            rules::topic_tags(&content)
        } else {
            req.tags
        };

        let _gate = self.gate()?;
        if let Some(existing) = self.find_duplicate(&content, category)? {
            debug!(id = %existing.id, "manual entry matches an existing one");
            return Ok(AddOutcome {
                entry: existing,
                relationships: Vec::new(),
                deduplicated: true,
            });
        }

        let (entry, relationships) = self.persist(NewEntry {
            content,
            category,
            tags,
            confidence,
            source: EntrySource::Manual,
        })?;
        info!(id = %entry.id, category = %entry.category, "entry added");

        Ok(AddOutcome {
            entry,
            relationships,
            deduplicated: false,
        })
    }

    pub fn get_entry(&self, id: &str) -> Result<ContextEntry, VaultError> {
        store::get_entry(&*self.conn()?, id)?
            .ok_or_else(|| VaultError::NotFound(format!("entry {id}")))
    }

    pub fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ContextEntry>, VaultError> {
        Ok(store::list_entries(&*self.conn()?, filter)?)
    }

    /// Similarity-ranked active entries. Read-only: access counts are untouched.
    pub fn search_entries(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, VaultError> {
        let found = nearest(&*self.conn()?, self.index.as_ref(), query, limit, 0.0, |e, _| {
            e.is_active()
        })
        .map_err(VaultError::RetrievalUnavailable)?;
        Ok(found
            .into_iter()
            .map(|(entry, similarity)| SearchHit { entry, similarity })
            .collect())
    }

    /// Score the candidate pool for `query` within `scope` and pick entries for a budget.
    ///
    /// The pool holds up to `candidate_pool` active entries the scope allows. An empty
    /// or fully filtered pool gives an empty selection. Access is not recorded here.
    pub fn select(
        &self,
        query: &str,
        scope: &CategoryScope,
        budget: usize,
    ) -> Result<Vec<ScoredCandidate>, VaultError> {
        if scope.is_empty() || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cfg = &self.config.retrieval;

        let pool = nearest(
            &*self.conn()?,
            self.index.as_ref(),
            query,
            cfg.candidate_pool,
            cfg.min_similarity,
            |e, _| e.is_active() && scope.allows(e.category),
        )
        .map_err(VaultError::RetrievalUnavailable)?;
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        Ok(scorer::select(
            scorer::score_pool(pool, Utc::now(), cfg),
            budget,
            cfg.budget_unit,
            cfg,
        ))
    }

    /// Select entries for a prompt and render the injection prefix.
    ///
    /// Only entries that made it into the rendered prefix have their access recorded.
    pub fn retrieve(&self, query: &str, scope: &CategoryScope) -> Result<Retrieval, VaultError> {
        let cfg = &self.config.retrieval;
        let selected = self.select(query, scope, cfg.token_budget)?;
        if selected.is_empty() {
            return Ok(Retrieval::empty());
        }
        let entries: Vec<ContextEntry> = selected.iter().map(|c| c.entry.clone()).collect();
        let context = injector::render(&entries, cfg.token_budget, cfg.budget_unit);

        let injected: Vec<&str> = entries[..context.included]
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        store::record_access(&*self.conn()?, &injected, Utc::now())
            .map_err(VaultError::RetrievalUnavailable)?;

        debug!(
            selected = selected.len(),
            injected = context.included,
            "context retrieved"
        );
        Ok(Retrieval { selected, context })
    }

    /// Learn from a completed exchange. Returns the entries newly persisted; candidates
    /// that matched an existing entry reinforce it instead.
    pub fn observe(&self, prompt: &str, response: &str) -> Result<Vec<ContextEntry>, VaultError> {
        let cfg = &self.config.learning;
        if !cfg.enabled {
            return Ok(Vec::new());
        }
        let candidates = learner::extract(prompt, response, cfg);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let _gate = self.gate()?;
        let mut created = Vec::new();
        for candidate in candidates {
            if let Some(existing) = self.find_duplicate(&candidate.content, candidate.category)? {
                let outcome = store::reinforce_entry(
                    &mut *self.conn()?,
                    &existing.id,
                    cfg.reinforcement_step,
                    cfg.promotion_threshold,
                    Utc::now(),
                )?;
                if outcome.promoted {
                    info!(id = %existing.id, confidence = outcome.confidence, "learned entry promoted");
                }
                continue;
            }

            let (entry, _) = self.persist(NewEntry {
                content: candidate.content,
                category: candidate.category,
                tags: candidate.tags,
                confidence: candidate.confidence,
                source: EntrySource::Learned,
            })?;
            debug!(id = %entry.id, category = %entry.category, "learned entry stored");
            created.push(entry);
        }

        if !created.is_empty() {
            info!(learned = created.len(), "exchange observed");
        }
        Ok(created)
    }

    /// Manually validate an entry, lifting it to the manual confidence.
    pub fn confirm_entry(&self, id: &str) -> Result<ContextEntry, VaultError> {
        let _gate = self.gate()?;
        self.get_entry(id)?;
        Ok(store::confirm_entry(
            &mut *self.conn()?,
            id,
            self.config.learning.manual_confidence,
            Utc::now(),
        )?)
    }

    pub fn relationships_for(&self, id: &str) -> Result<Vec<Relationship>, VaultError> {
        self.get_entry(id)?;
        Ok(relations::relationships_for(&*self.conn()?, id)?)
    }

    pub fn set_permission(&self, model_id: &str, scope: &CategoryScope) -> Result<(), VaultError> {
        if model_id.trim().is_empty() {
            return Err(VaultError::InvalidInput("model id must not be empty".into()));
        }
        permissions::set_permission(&*self.conn()?, model_id, scope, Utc::now())?;
        info!(model = %model_id, scope = ?scope, "permission updated");
        Ok(())
    }

    pub fn list_permissions(&self) -> Result<Vec<PermissionRecord>, VaultError> {
        Ok(permissions::list_permissions(&*self.conn()?)?)
    }

    /// Categories a caller model may receive.
    pub fn allowed_scope(&self, model_id: &str) -> Result<CategoryScope, VaultError> {
        Ok(permissions::resolve_scope(&*self.conn()?, model_id)?)
    }

    pub fn check_permission(&self, model_id: &str, category: Category) -> Result<(), VaultError> {
        if self.allowed_scope(model_id)?.allows(category) {
            Ok(())
        } else {
            Err(VaultError::PermissionDenied {
                model: model_id.to_string(),
                category,
            })
        }
    }

    /// Snapshot of everything stored, oldest entries first.
    pub fn export(&self) -> Result<VaultExport, VaultError> {
        let conn = self.conn()?;
        let mut entries = store::list_entries(
            &conn,
            &EntryFilter {
                include_superseded: true,
                ..Default::default()
            },
        )?;
        entries.reverse();
        let relationships = relations::list_relationships(&conn)?;
        let permissions = permissions::list_permissions(&conn)?
            .into_iter()
            .map(|record| ExportedPermission {
                model_id: record.model_id,
                scope: record.scope,
            })
            .collect();

        Ok(VaultExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            entries,
            relationships,
            permissions,
        })
    }

    /// Restore an export. Entries keep their ids, timestamps and supersession marks;
    /// ids already present are skipped, as are permissions already set. Edges are
    /// restored when both endpoints exist. No dedup or conflict pass runs.
    pub fn import(&self, data: VaultExport) -> Result<ImportSummary, VaultError> {
        if data.version > EXPORT_VERSION {
            return Err(VaultError::InvalidInput(format!(
                "unsupported export version {} (newest known is {EXPORT_VERSION})",
                data.version
            )));
        }
        let now = Utc::now();
        let mut summary = ImportSummary::default();

        let _gate = self.gate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;

        let mut imported = Vec::new();
        for entry in &data.entries {
            if store::restore_entry(&tx, entry, now)? {
                imported.push(entry);
            } else {
                summary.entries_skipped += 1;
            }
        }
        for entry in &imported {
            if let Some(winner) = &entry.superseded_by {
                if store::get_entry(&tx, winner)?.is_some() {
                    store::restore_superseded(&tx, &entry.id, winner)?;
                } else {
                    warn!(entry = %entry.id, winner = %winner, "supersession target missing; entry left active");
                }
            }
        }

        for edge in &data.relationships {
            let endpoints_exist = store::get_entry(&tx, &edge.from_id)?.is_some()
                && store::get_entry(&tx, &edge.to_id)?.is_some();
            if endpoints_exist && relations::restore_relationship(&tx, edge)? {
                summary.relationships_imported += 1;
            } else {
                summary.relationships_skipped += 1;
            }
        }

        for permission in &data.permissions {
            if permissions::get_permission(&tx, &permission.model_id)?.is_none() {
                permissions::set_permission(&tx, &permission.model_id, &permission.scope, now)?;
                summary.permissions_imported += 1;
            }
        }
        tx.commit().map_err(anyhow::Error::from)?;
        drop(conn);

        let docs: Vec<(String, String)> = imported
            .iter()
            .map(|e| (e.id.clone(), e.content.clone()))
            .collect();
        self.index
            .upsert_batch(&docs)
            .map_err(VaultError::RetrievalUnavailable)?;
        summary.entries_imported = imported.len();

        info!(
            entries = summary.entries_imported,
            skipped = summary.entries_skipped,
            relationships = summary.relationships_imported,
            "vault imported"
        );
        Ok(summary)
    }

    pub fn stats(&self) -> Result<VaultStats, VaultError> {
        Ok(stats::vault_stats(&*self.conn()?, self.db_path.as_deref())?)
    }

    pub fn health(&self) -> Result<VaultHealth, VaultError> {
        let conn = self.conn()?;
        let database = db::check_database_health(&conn)?;
        let stats = stats::vault_stats(&conn, self.db_path.as_deref())?;
        drop(conn);

        let indexed_entries = self.index.len();
        let in_sync = indexed_entries as u64 == stats.total_entries;
        let status = if database.integrity_ok && in_sync { "ok" } else { "degraded" };

        Ok(VaultHealth {
            status,
            database,
            index_backend: self.index.name(),
            indexed_entries,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::lexical::LexicalIndex;

    fn vault() -> Vault {
        let conn = db::open_memory_database().unwrap();
        Vault::with_parts(conn, Arc::new(LexicalIndex::new()), Arc::new(VaultConfig::default()))
            .unwrap()
    }

    fn add(vault: &Vault, content: &str) -> AddOutcome {
        vault
            .add_entry(AddEntry {
                content: content.into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn add_classifies_and_defaults_confidence() {
        let vault = vault();
        let outcome = add(&vault, "I have two cats named Luna and Pixel");
        assert_eq!(outcome.entry.category, Category::Personal);
        assert_eq!(outcome.entry.source, EntrySource::Manual);
        assert!((outcome.entry.confidence - 1.0).abs() < 1e-9);
        assert_eq!(vault.index().len(), 1);
    }

    #[test]
    fn add_rejects_empty_content() {
        let vault = vault();
        let err = vault
            .add_entry(AddEntry {
                content: "   ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
    }

    #[test]
    fn add_same_text_twice_deduplicates() {
        let vault = vault();
        let first = add(&vault, "I like green tea");
        let second = add(&vault, "I like green tea");
        assert!(second.deduplicated);
        assert_eq!(first.entry.id, second.entry.id);
    }

    #[test]
    fn duplicate_is_found_behind_other_categories() {
        let vault = vault();
        for category in Category::ALL {
            if category == Category::Preference {
                continue;
            }
            vault
                .add_entry(AddEntry {
                    content: "I like green tea".into(),
                    category: Some(category),
                    ..Default::default()
                })
                .unwrap();
        }
        let first = add(&vault, "I like green tea");
        let second = add(&vault, "I like green tea");
        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(first.entry.id, second.entry.id);
    }

    #[test]
    fn manual_entries_get_topic_tags() {
        let vault = vault();
        let entry = add(&vault, "I have two cats named Luna and Pixel").entry;
        assert!(entry.tags.contains("pets"));

        let tagged = vault
            .add_entry(AddEntry {
                content: "I have a cat".into(),
                tags: ["mine".to_string()].into_iter().collect(),
                ..Default::default()
            })
            .unwrap()
            .entry;
        assert_eq!(tagged.tags.len(), 1);
        assert!(tagged.tags.contains("mine"));
    }

    #[test]
    fn retrieval_records_access_but_search_does_not() {
        let vault = vault();
        let entry = add(&vault, "I live in Seattle").entry;

        vault.search_entries("Seattle", 5).unwrap();
        assert_eq!(vault.get_entry(&entry.id).unwrap().access_count, 0);

        let retrieval = vault.retrieve("Where do I live", &CategoryScope::AllowAll).unwrap();
        assert_eq!(retrieval.selected.len(), 1);
        assert!(retrieval.context.text.contains("I live in Seattle"));
        assert_eq!(vault.get_entry(&entry.id).unwrap().access_count, 1);
    }

    #[test]
    fn scope_filters_categories() {
        let vault = vault();
        add(&vault, "I live in Seattle");
        let only_goals = CategoryScope::Categories([Category::Goal].into_iter().collect());
        assert!(vault.retrieve("Seattle", &only_goals).unwrap().selected.is_empty());
        assert!(vault.retrieve("Seattle", &CategoryScope::DenyAll).unwrap().selected.is_empty());
    }

    #[test]
    fn observe_learns_then_reinforces() {
        let vault = vault();
        let learned = vault.observe("I enjoy rock climbing on weekends.", "").unwrap();
        assert_eq!(learned.len(), 1);
        assert_eq!(learned[0].source, EntrySource::Learned);
        assert!(learned[0].confidence < vault.config().learning.promotion_threshold);

        let again = vault.observe("I enjoy rock climbing on weekends!", "").unwrap();
        assert!(again.is_empty());
        let reinforced = vault.get_entry(&learned[0].id).unwrap();
        assert!(reinforced.confidence > learned[0].confidence);
    }

    #[test]
    fn permission_check_reports_denial() {
        let vault = vault();
        let err = vault.check_permission("llama3", Category::Personal).unwrap_err();
        assert!(matches!(err, VaultError::PermissionDenied { .. }));

        vault.set_permission("llama3", &CategoryScope::AllowAll).unwrap();
        vault.check_permission("llama3:8b", Category::Personal).unwrap();
    }

    #[test]
    fn confirm_promotes_learned_entry() {
        let vault = vault();
        let learned = vault.observe("I'm learning the cello.", "").unwrap();
        let confirmed = vault.confirm_entry(&learned[0].id).unwrap();
        assert!((confirmed.confidence - 1.0).abs() < 1e-9);
        assert!(matches!(vault.confirm_entry("nope"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn health_reports_index_in_sync() {
        let vault = vault();
        add(&vault, "I live in Seattle");
        let health = vault.health().unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.indexed_entries, 1);
        assert_eq!(health.index_backend, "lexical");
    }
}
