//! Similarity index over entry text.
//!
//! The index is a derived projection of the entry store: it is rebuilt from the store
//! at startup and updated after every durable insert, never before. Two backends
//! implement [`SimilarityIndex`]:
//!
//! - [`lexical::LexicalIndex`]: TF-IDF cosine, no model files required (default).
//! - [`dense::DenseIndex`]: cosine over sentence embeddings from the local ONNX model.

pub mod dense;
pub mod lexical;

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::SimilarityConfig;

/// One index match. `similarity` lies in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityHit {
    pub id: String,
    pub similarity: f64,
}

/// Queryable text representation of every entry.
///
/// `upsert` must be visible to any `query` issued after it returns. Identical text
/// scores the maximum similarity against itself.
pub trait SimilarityIndex: Send + Sync {
    /// Backend name recorded in `schema_meta`.
    fn name(&self) -> &'static str;

    fn upsert(&self, id: &str, text: &str) -> Result<()>;

    /// Bulk load used by index rebuilds.
    fn upsert_batch(&self, docs: &[(String, String)]) -> Result<()> {
        for (id, text) in docs {
            self.upsert(id, text)?;
        }
        Ok(())
    }

    /// Up to `limit` hits, best first; ties ordered by id.
    fn query(&self, text: &str, limit: usize) -> Result<Vec<SimilarityHit>>;

    fn clear(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercase alphanumeric tokens. Apostrophes inside words are kept (`i'm`, `don't`).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|t| t.trim_matches(|c| c == '\'' || c == '\u{2019}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\u{2019}', "'").to_lowercase())
        .collect()
}

/// Order hits best first, ties by id, and cut to `limit`.
pub(crate) fn rank_hits(mut hits: Vec<SimilarityHit>, limit: usize) -> Vec<SimilarityHit> {
    hits.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    hits
}

/// Build the configured backend.
pub fn create_index(config: &SimilarityConfig) -> Result<Arc<dyn SimilarityIndex>> {
    match config.backend.as_str() {
        "lexical" => Ok(Arc::new(lexical::LexicalIndex::new())),
        "dense" => {
            let embedder = crate::embedding::local::OnnxEmbedder::new(config)?;
            Ok(Arc::new(dense::DenseIndex::new(Box::new(embedder))))
        }
        other => bail!("unknown similarity backend: {other}. Supported: lexical, dense"),
    }
}
