//! Last-indexed state of a file, the anchor `FileState` exclusively owns its
//! chunks (spec.md §3 ownership tree).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::FileId;

/// Outcome of comparing a discovered file against its last stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    New,
    Modified,
    Unchanged,
    Deleted,
}

/// The last-indexed state of one file, keyed by its relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
    pub file_id: FileId,
    /// Always relative to the index root (spec.md §9 Open Question #1).
    pub relative_path: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub mtime_ns: i64,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub fingerprint: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl FileState {
    #[must_use]
    pub fn new(relative_path: impl Into<String>, content_hash: impl Into<String>, size_bytes: u64, mtime_ns: i64) -> Self {
        Self {
            file_id: FileId::new(),
            relative_path: relative_path.into(),
            content_hash: content_hash.into(),
            size_bytes,
            mtime_ns,
            language: None,
            kind: None,
            fingerprint: None,
            indexed_at: Utc::now(),
            is_deleted: false,
        }
    }
}
