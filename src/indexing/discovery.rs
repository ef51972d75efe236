//! File discovery: walk configured roots and apply `PathValidator` rules to
//! produce a deduplicated, absolute, normalized candidate path list
//! (spec.md §4.10).
//!
//! Grounded on the teacher's plain recursive `tokio::fs::read_dir` walks
//! (`agent_definition.rs`, `adapter_loader.rs`) rather than a `walkdir`
//! dependency, which the example pack never uses for this purpose.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

/// Composes ignore globs, allow/block extension lists, symlink policy, and
/// a size limit into a single admission check per candidate path.
#[derive(Debug, Clone)]
pub struct PathValidator {
    pub ignore_globs: Vec<String>,
    pub allowed_extensions: Option<HashSet<String>>,
    pub blocked_extensions: HashSet<String>,
    pub follow_symlinks: bool,
    pub max_size_bytes: u64,
}

impl Default for PathValidator {
    fn default() -> Self {
        Self {
            ignore_globs: vec![
                "**/.git/**".to_string(),
                "**/target/**".to_string(),
                "**/node_modules/**".to_string(),
            ],
            allowed_extensions: None,
            blocked_extensions: HashSet::new(),
            follow_symlinks: false,
            max_size_bytes: 10 * 1024 * 1024,
        }
    }
}

impl PathValidator {
    /// `true` iff `path` (relative to the walk root) should be indexed.
    #[must_use]
    pub fn admits(&self, relative_path: &Path, size_bytes: u64, is_symlink: bool) -> bool {
        if is_symlink && !self.follow_symlinks {
            return false;
        }
        if size_bytes > self.max_size_bytes {
            return false;
        }
        if self.matches_any_ignore_glob(relative_path) {
            return false;
        }
        let extension = relative_path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
        if let Some(ext) = &extension {
            if self.blocked_extensions.contains(ext) {
                return false;
            }
        }
        match &self.allowed_extensions {
            Some(allowed) => extension.as_deref().is_some_and(|ext| allowed.contains(ext)),
            None => true,
        }
    }

    fn matches_any_ignore_glob(&self, relative_path: &Path) -> bool {
        let path_str = relative_path.to_string_lossy().replace('\\', "/");
        self.ignore_globs.iter().any(|glob| glob_matches(glob, &path_str))
    }
}

/// Minimal `**`/`*` glob matcher sufficient for directory-segment ignore
/// patterns like `**/.git/**`; not a general-purpose glob engine.
fn glob_matches(pattern: &str, candidate: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let candidate_segments: Vec<&str> = candidate.split('/').collect();
    segments_match(&pattern_segments, &candidate_segments)
}

fn segments_match(pattern: &[&str], candidate: &[&str]) -> bool {
    match pattern.first() {
        None => candidate.is_empty(),
        Some(&"**") => {
            if pattern.len() == 1 {
                return true;
            }
            (0..=candidate.len()).any(|i| segments_match(&pattern[1..], &candidate[i..]))
        }
        Some(&segment) => match candidate.first() {
            Some(&candidate_segment) if segment_matches(segment, candidate_segment) => {
                segments_match(&pattern[1..], &candidate[1..])
            }
            _ => false,
        },
    }
}

fn segment_matches(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once('*') {
        Some((prefix, suffix)) => candidate.starts_with(prefix) && candidate.ends_with(suffix),
        None => pattern == candidate,
    }
}

/// Walk `root` recursively, returning deduplicated absolute normalized
/// paths admitted by `validator`. Suspends on filesystem I/O (spec.md §5).
pub async fn discover(root: &Path, validator: &PathValidator) -> OrchestratorResult<Vec<PathBuf>> {
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| OrchestratorError::FileNotFound(format!("{}: {e}", root.display())))?;

    let mut discovered = Vec::new();
    let mut seen = HashSet::new();
    walk(&root, &root, validator, &mut discovered, &mut seen).await?;
    discovered.sort();
    Ok(discovered)
}

fn walk<'a>(
    root: &'a Path,
    dir: &'a Path,
    validator: &'a PathValidator,
    out: &'a mut Vec<PathBuf>,
    seen: &'a mut HashSet<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = OrchestratorResult<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| OrchestratorError::FileNotFound(format!("{}: {e}", dir.display())))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            OrchestratorError::FileNotFound(format!("{}: {e}", dir.display()))
        })? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            let is_symlink = entry.path().symlink_metadata().map(|m| m.is_symlink()).unwrap_or(false);

            if metadata.is_dir() {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if validator.matches_any_ignore_glob(relative) {
                    continue;
                }
                walk(root, &path, validator, out, seen).await?;
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if validator.admits(&relative, metadata.len(), is_symlink) && seen.insert(path.clone()) {
                out.push(path);
            }
        }
        Ok(())
    })
}
