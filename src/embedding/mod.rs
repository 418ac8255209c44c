//! Sentence embeddings for the dense similarity backend.
//!
//! [`Embedder`] turns text into an L2-normalized vector. The only implementation is
//! [`local::OnnxEmbedder`], which runs all-MiniLM-L6-v2 (384 dimensions) through ONNX
//! Runtime from the model cache directory.

pub mod local;

use anyhow::Result;

/// Output width of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Files `contextvault model download` places in the cache directory.
pub const MODEL_FILES: [(&str, &str); 2] = [
    (
        "model.onnx",
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
    ),
];

/// Text to vector. Synchronous; async callers go through `spawn_blocking`.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// L2-normalize a vector. A zero vector is returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
