//! Symbol: a named declaration extracted from a chunk. Symbols reference
//! but do not own chunks or files (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::identifiers::{ChunkId, FileId, SymbolId};

/// The declaration kind a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Class,
    Interface,
    Function,
    Method,
    Property,
    Variable,
    Import,
}

/// A named declaration found while extracting symbols from a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol_id: SymbolId,
    pub file_id: FileId,
    pub chunk_id: ChunkId,
    pub symbol_type: SymbolType,
    pub name: String,
    pub qualified_name: Option<String>,
    pub signature: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
}
