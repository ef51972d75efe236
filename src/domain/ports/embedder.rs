//! Embedder port — the external collaborator boundary spec.md §1 treats as
//! a pure function `text -> unit vector`.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;

/// External text-embedding model binding. Vectors returned must be finite;
/// normalization is implementation-specific but must be documented
/// (spec.md §6) — this crate L2-normalizes on store regardless
/// (`domain::models::embedding::Embedding::new`), so a non-unit-norm
/// embedder is still safe to plug in.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> OrchestratorResult<Vec<f32>>;

    /// Batch form; implementations may override for efficiency. The
    /// default calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> OrchestratorResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> u32;

    fn model_name(&self) -> &str;
}

/// Deterministic hash-based embedder used by tests: maps text to a fixed
/// small vector via a simple bag-of-characters hash, so equal text always
/// embeds identically and near-duplicate text embeds to nearby vectors.
pub struct MockEmbedder {
    dimension: u32,
    model_name: String,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimension: u32) -> Self {
        Self {
            dimension,
            model_name: "mock-embedder-v1".to_string(),
        }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> OrchestratorResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension as usize];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % vector.len().max(1);
            vector[slot] += f32::from(byte) / 255.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
