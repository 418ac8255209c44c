//! ONNX Runtime embedder for all-MiniLM-L6-v2.
//!
//! Tokenizes, runs inference, mean-pools over the attention mask and L2-normalizes.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, ensure, Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize, Embedder, EMBEDDING_DIM};
use crate::config::SimilarityConfig;

/// The model was trained with 256-token windows.
const MAX_SEQ_LEN: usize = 256;

pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: the session is only touched while its Mutex is held; Tokenizer is Send + Sync.
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}

/// Resolved model cache directory for a similarity config.
pub fn model_dir(config: &SimilarityConfig) -> PathBuf {
    crate::config::expand_tilde(&config.cache_dir).join(&config.model)
}

impl OnnxEmbedder {
    pub fn new(config: &SimilarityConfig) -> Result<Self> {
        let dir = model_dir(config);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `contextvault model download` first.",
            model_path.display()
        );
        ensure!(
            tokenizer_path.exists(),
            "tokenizer not found at {}. Run `contextvault model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("failed to set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(model = %model_path.display(), "embedding model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedding batch returned no vector"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;

        let batch = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape.clone(), ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape.clone(), mask.clone().into_boxed_slice()))?;
        let type_ids_tensor =
            Tensor::from_array((shape, vec![0i64; batch * seq_len].into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_ids_tensor,
        })?;

        // Output naming differs between exports.
        let hidden = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings")?;
        let dims: &[i64] = &shape;

        ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embedding shape {dims:?}"
        );
        let out_seq = dims[1] as usize;

        let mut vectors = Vec::with_capacity(batch);
        for b in 0..batch {
            let mut pooled = vec![0.0f32; EMBEDDING_DIM];
            let mut count = 0.0f32;
            for s in 0..out_seq {
                if mask[b * seq_len + s] == 0 {
                    continue;
                }
                let offset = (b * out_seq + s) * EMBEDDING_DIM;
                for (d, value) in pooled.iter_mut().enumerate() {
                    *value += data[offset + d];
                }
                count += 1.0;
            }
            if count > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= count);
            }
            vectors.push(l2_normalize(&pooled));
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimilarityConfig {
            backend: "dense".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir: dir.path().to_string_lossy().into_owned(),
        };
        let err = OnnxEmbedder::new(&config).err().unwrap().to_string();
        assert!(err.contains("model download"), "{err}");
    }

    #[test]
    #[ignore] // needs model files: cargo test -- --ignored
    fn embeds_to_unit_vectors() {
        let embedder = OnnxEmbedder::new(&SimilarityConfig::default()).unwrap();
        let vectors = embedder.embed_batch(&["I have two cats", "I own a dog"]).unwrap();
        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.len(), EMBEDDING_DIM);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }
}
