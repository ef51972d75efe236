//! Embedding vectors produced for a chunk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{ChunkId, EmbeddingId};

/// A stored embedding vector, exclusively owned by its chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub embedding_id: EmbeddingId,
    pub chunk_id: ChunkId,
    pub model: String,
    pub dimensions: u32,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    /// Construct, normalizing the vector to unit L2 length on store
    /// (spec.md §4.10). Returns `None` if the vector is the zero vector or
    /// contains a non-finite component.
    #[must_use]
    pub fn new(chunk_id: ChunkId, model: impl Into<String>, vector: Vec<f32>) -> Option<Self> {
        if vector.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let norm = l2_norm(&vector);
        if norm == 0.0 {
            return None;
        }
        let normalized: Vec<f32> = vector.iter().map(|v| v / norm).collect();
        let dimensions = normalized.len() as u32;
        Some(Self {
            embedding_id: EmbeddingId::new(),
            chunk_id,
            model: model.into(),
            dimensions,
            vector: normalized,
            created_at: Utc::now(),
        })
    }

    /// `|vector| == dimensions` invariant (spec.md §3).
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.vector.len() as u32 == self.dimensions
    }

    /// Whether the stored vector has unit L2 norm within the 1e-4 tolerance
    /// spec.md §8 (T4) requires.
    #[must_use]
    pub fn is_unit_norm(&self) -> bool {
        (l2_norm(&self.vector) - 1.0).abs() < 1e-4
    }
}

#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// L2-normalize a vector in place; a no-op on the zero vector.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_to_unit_length() {
        let emb = Embedding::new(ChunkId::new(), "test-model", vec![3.0, 4.0]).unwrap();
        assert!(emb.is_unit_norm());
        assert!(emb.invariant_holds());
    }

    #[test]
    fn rejects_zero_vector() {
        assert!(Embedding::new(ChunkId::new(), "test-model", vec![0.0, 0.0]).is_none());
    }

    #[test]
    fn rejects_non_finite_components() {
        assert!(Embedding::new(ChunkId::new(), "test-model", vec![f32::NAN, 1.0]).is_none());
    }
}
