//! Chunk: the atomic unit of embedding and retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{ChunkId, FileId};

/// What kind of content a chunk spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Markdown,
    Code,
    PlainText,
}

/// A contiguous region of a file, the atomic unit of embedding and
/// retrieval. `(file_id, ordinal)` is unique (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub file_id: FileId,
    pub ordinal: u32,
    pub kind: ChunkKind,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub token_estimate: Option<u32>,
    pub content: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    #[must_use]
    pub fn new(file_id: FileId, ordinal: u32, kind: ChunkKind, content: impl Into<String>) -> Self {
        let content = content.into();
        let token_estimate = Some(estimate_tokens(&content));
        Self {
            chunk_id: ChunkId::new(),
            file_id,
            ordinal,
            kind,
            start_line: None,
            end_line: None,
            token_estimate,
            content,
            summary: None,
            created_at: Utc::now(),
        }
    }
}

/// Fallback token estimate used when a chunk has no explicit
/// `token_estimate`: `ceil(len / 4)` (spec.md §4.11 token-budget fallback).
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    ((text.len() + 3) / 4) as u32
}
