//! Link: a reference from one chunk to another file/chunk, e.g. an import
//! or a cross-reference surfaced by retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{ChunkId, FileId, LinkId};

/// What relationship a link expresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Import,
    Reference,
    CoChanged,
    Commit,
}

/// A reference from a source chunk to a target file/chunk. Links carry
/// source/target IDs only — ownership is a tree rooted at `FileState`, so
/// cyclic chunk/link/embedding references never arise (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub link_id: LinkId,
    pub source_chunk_id: ChunkId,
    pub target_file_id: FileId,
    pub target_chunk_id: Option<ChunkId>,
    pub link_type: LinkType,
    pub label: String,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Link {
    #[must_use]
    pub fn new(source_chunk_id: ChunkId, target_file_id: FileId, link_type: LinkType, label: impl Into<String>) -> Self {
        Self {
            link_id: LinkId::new(),
            source_chunk_id,
            target_file_id,
            target_chunk_id: None,
            link_type,
            label: label.into(),
            score: None,
            created_at: Utc::now(),
        }
    }
}
