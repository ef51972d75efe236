//! Chunking: language-aware splitting into `Chunk` records (spec.md §4.10).
//!
//! Markdown splits on heading boundaries; code splits on function/class
//! boundaries when a regex recognizes the declaration syntax, falling back
//! to a fixed-token window otherwise. Doc comments stay attached to the
//! declaration that follows them, mirroring the teacher's chunker keeping
//! a docstring adjacent to its function in `infrastructure::vector::chunker`.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::models::{Chunk, ChunkKind};
use crate::identifiers::FileId;

/// Default maximum tokens per chunk (spec.md §4.10 `maxTokens`).
pub const DEFAULT_MAX_TOKENS: u32 = 512;

fn markdown_heading() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^#{1,6}\s+\S").unwrap())
}

/// Declaration boundaries recognized across the common curly-brace and
/// Python-style languages this crate chunks by structure rather than by
/// fixed window.
fn code_declaration() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|class|struct|enum|trait|impl|def|function|interface)\s+\w",
        )
        .unwrap()
    })
}

fn doc_comment_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(///|//!|#|\*|/\*\*)").unwrap())
}

/// Split `content` into ordered chunks for `file_id`, choosing the
/// algorithm by `kind`.
#[must_use]
pub fn chunk_content(file_id: FileId, kind: ChunkKind, content: &str, max_tokens: u32) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    let segments = match kind {
        ChunkKind::Markdown => split_markdown(content, max_tokens),
        ChunkKind::Code => split_code(content, max_tokens),
        ChunkKind::PlainText => split_fixed_window(content, max_tokens),
    };
    segments
        .into_iter()
        .enumerate()
        .map(|(ordinal, (segment, start_line, end_line))| {
            let mut chunk = Chunk::new(file_id, ordinal as u32, kind, segment);
            chunk.start_line = Some(start_line);
            chunk.end_line = Some(end_line);
            chunk
        })
        .collect()
}

/// `(text, start_line, end_line)`, 1-indexed inclusive.
type Segment = (String, u32, u32);

fn split_markdown(content: &str, max_tokens: u32) -> Vec<Segment> {
    let lines: Vec<&str> = content.lines().collect();
    let mut boundaries: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| markdown_heading().is_match(line))
        .map(|(i, _)| i)
        .collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(lines.len());

    let mut segments = Vec::new();
    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);
        if start >= end {
            continue;
        }
        let section = lines[start..end].join("\n");
        segments.extend(split_by_token_budget(&section, start as u32 + 1, max_tokens));
    }
    segments
}

fn split_code(content: &str, max_tokens: u32) -> Vec<Segment> {
    let lines: Vec<&str> = content.lines().collect();
    let mut boundaries: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| code_declaration().is_match(line))
        .map(|(i, _)| doc_start_for_line(&lines, i))
        .collect();

    if boundaries.is_empty() {
        return split_fixed_window(content, max_tokens);
    }
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(lines.len());
    boundaries.dedup();

    let mut segments = Vec::new();
    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);
        if start >= end {
            continue;
        }
        let section = lines[start..end].join("\n");
        segments.extend(split_by_token_budget(&section, start as u32 + 1, max_tokens));
    }
    segments
}

/// Walk upward from a declaration line to absorb a contiguous run of
/// immediately preceding doc-comment lines, so they stay in the same
/// chunk as the declaration.
fn doc_start_for_line(lines: &[&str], declaration_index: usize) -> usize {
    let mut start = declaration_index;
    while start > 0 && doc_comment_line().is_match(lines[start - 1]) {
        start -= 1;
    }
    start
}

fn split_fixed_window(content: &str, max_tokens: u32) -> Vec<Segment> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    split_by_token_budget(&lines.join("\n"), 1, max_tokens)
}

/// Greedily pack lines of `section` (whose first line is `first_line`,
/// 1-indexed) into windows that stay under `max_tokens` estimated tokens.
fn split_by_token_budget(section: &str, first_line: u32, max_tokens: u32) -> Vec<Segment> {
    let lines: Vec<&str> = section.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut current_tokens = 0u32;
    let mut segment_start_line = first_line;

    for (offset, line) in lines.iter().enumerate() {
        let line_tokens = crate::domain::models::chunk::estimate_tokens(line).max(1);
        if !current.is_empty() && current_tokens + line_tokens > max_tokens {
            segments.push((
                current.join("\n"),
                segment_start_line,
                segment_start_line + current.len() as u32 - 1,
            ));
            current = Vec::new();
            current_tokens = 0;
            segment_start_line = first_line + offset as u32;
        }
        current.push(*line);
        current_tokens += line_tokens;
    }
    if !current.is_empty() {
        segments.push((
            current.join("\n"),
            segment_start_line,
            segment_start_line + current.len() as u32 - 1,
        ));
    }
    segments
}
