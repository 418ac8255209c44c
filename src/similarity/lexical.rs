//! TF-IDF cosine index.
//!
//! Documents keep raw term counts; IDF is smoothed (`ln((N+1)/(df+1)) + 1`) and
//! computed from the live document-frequency table at query time, so an upsert
//! never requires reweighting the rest of the corpus.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::{rank_hits, tokenize, SimilarityHit, SimilarityIndex};

#[derive(Default)]
struct Corpus {
    docs: HashMap<String, HashMap<String, u32>>,
    df: HashMap<String, u32>,
}

impl Corpus {
    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.df.get(term).copied().unwrap_or(0) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    fn remove(&mut self, id: &str) {
        if let Some(old) = self.docs.remove(id) {
            for term in old.keys() {
                if let Some(count) = self.df.get_mut(term) {
                    *count -= 1;
                    if *count == 0 {
                        self.df.remove(term);
                    }
                }
            }
        }
    }

    fn insert(&mut self, id: &str, tf: HashMap<String, u32>) {
        self.remove(id);
        for term in tf.keys() {
            *self.df.entry(term.clone()).or_insert(0) += 1;
        }
        self.docs.insert(id.to_string(), tf);
    }
}

fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut tf = HashMap::new();
    for token in tokenize(text) {
        *tf.entry(token).or_insert(0) += 1;
    }
    tf
}

#[derive(Default)]
pub struct LexicalIndex {
    corpus: RwLock<Corpus>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SimilarityIndex for LexicalIndex {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn upsert(&self, id: &str, text: &str) -> Result<()> {
        let tf = term_counts(text);
        let mut corpus = self
            .corpus
            .write()
            .map_err(|_| anyhow!("lexical index lock poisoned"))?;
        corpus.insert(id, tf);
        Ok(())
    }

    fn query(&self, text: &str, limit: usize) -> Result<Vec<SimilarityHit>> {
        let corpus = self
            .corpus
            .read()
            .map_err(|_| anyhow!("lexical index lock poisoned"))?;

        let query: HashMap<String, f64> = term_counts(text)
            .into_iter()
            .map(|(term, count)| {
                let weight = count as f64 * corpus.idf(&term);
                (term, weight)
            })
            .collect();
        let query_norm = query.values().map(|w| w * w).sum::<f64>().sqrt();
        if query_norm == 0.0 || limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for (id, tf) in &corpus.docs {
            let mut dot = 0.0;
            let mut doc_norm = 0.0;
            for (term, &count) in tf {
                let weight = count as f64 * corpus.idf(term);
                doc_norm += weight * weight;
                if let Some(q) = query.get(term) {
                    dot += q * weight;
                }
            }
            if dot <= 0.0 {
                continue;
            }
            let similarity = (dot / (query_norm * doc_norm.sqrt())).clamp(0.0, 1.0);
            hits.push(SimilarityHit {
                id: id.clone(),
                similarity,
            });
        }

        Ok(rank_hits(hits, limit))
    }

    fn clear(&self) -> Result<()> {
        let mut corpus = self
            .corpus
            .write()
            .map_err(|_| anyhow!("lexical index lock poisoned"))?;
        *corpus = Corpus::default();
        Ok(())
    }

    fn len(&self) -> usize {
        self.corpus.read().map(|c| c.docs.len()).unwrap_or(0)
    }
}
