//! Embedding-backed index: cosine over L2-normalized vectors held in memory.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, ensure, Result};
use ndarray::Array1;

use super::{rank_hits, SimilarityHit, SimilarityIndex};
use crate::embedding::Embedder;

/// Texts embedded per inference call during a rebuild.
const BATCH_SIZE: usize = 32;

pub struct DenseIndex {
    embedder: Box<dyn Embedder>,
    vectors: RwLock<HashMap<String, Array1<f32>>>,
}

impl DenseIndex {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            vectors: RwLock::new(HashMap::new()),
        }
    }
}

impl SimilarityIndex for DenseIndex {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn upsert(&self, id: &str, text: &str) -> Result<()> {
        let vector = Array1::from(self.embedder.embed(text)?);
        self.vectors
            .write()
            .map_err(|_| anyhow!("dense index lock poisoned"))?
            .insert(id.to_string(), vector);
        Ok(())
    }

    fn upsert_batch(&self, docs: &[(String, String)]) -> Result<()> {
        for chunk in docs.chunks(BATCH_SIZE) {
            let texts: Vec<&str> = chunk.iter().map(|(_, text)| text.as_str()).collect();
            let embedded = self.embedder.embed_batch(&texts)?;
            ensure!(
                embedded.len() == chunk.len(),
                "embedder returned {} vectors for {} texts",
                embedded.len(),
                chunk.len()
            );

            let mut vectors = self
                .vectors
                .write()
                .map_err(|_| anyhow!("dense index lock poisoned"))?;
            for ((id, _), vector) in chunk.iter().zip(embedded) {
                vectors.insert(id.clone(), Array1::from(vector));
            }
        }
        Ok(())
    }

    fn query(&self, text: &str, limit: usize) -> Result<Vec<SimilarityHit>> {
        if limit == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        // Embed before taking the lock so inference never blocks writers.
        let query = Array1::from(self.embedder.embed(text)?);

        let vectors = self
            .vectors
            .read()
            .map_err(|_| anyhow!("dense index lock poisoned"))?;
        let hits = vectors
            .iter()
            .filter(|(_, v)| v.len() == query.len())
            .map(|(id, v)| SimilarityHit {
                id: id.clone(),
                similarity: (query.dot(v) as f64).clamp(0.0, 1.0),
            })
            .filter(|hit| hit.similarity > 0.0)
            .collect();

        Ok(rank_hits(hits, limit))
    }

    fn clear(&self) -> Result<()> {
        self.vectors
            .write()
            .map_err(|_| anyhow!("dense index lock poisoned"))?
            .clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.vectors.read().map(|v| v.len()).unwrap_or(0)
    }
}
