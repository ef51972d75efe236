//! Content hashing for change detection: streamed SHA-256 over 8 KiB
//! buffers, lowercase hex output (spec.md §4.10).

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

const BUFFER_SIZE: usize = 8 * 1024;

/// Stream-hash the file at `path`. Fails with `FileNotFound` if the file
/// cannot be opened.
pub async fn hash_file(path: &std::path::Path) -> OrchestratorResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| OrchestratorError::FileNotFound(format!("{}: {e}", path.display())))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| OrchestratorError::FileNotFound(format!("{}: {e}", path.display())))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// In-memory variant used by tests and by callers that already hold the
/// file contents.
#[must_use]
pub fn hash_bytes(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_is_deterministic_and_lowercase_hex() {
        let a = hash_bytes(b"hello world");
        let b = hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_bytes_differs_for_different_content() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }

    #[tokio::test]
    async fn hash_file_reports_file_not_found() {
        let result = hash_file(std::path::Path::new("/nonexistent/path/does/not/exist")).await;
        assert!(matches!(result, Err(OrchestratorError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn hash_file_matches_hash_bytes_for_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        tokio::fs::write(&path, b"streamed content").await.unwrap();
        let streamed = hash_file(&path).await.unwrap();
        assert_eq!(streamed, hash_bytes(b"streamed content"));
    }
}
