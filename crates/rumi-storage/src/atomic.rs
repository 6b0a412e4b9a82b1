//! Atomic JSON writes.
//!
//! Serialize to a sibling temporary file in the destination directory,
//! fsync, then rename over the destination. A reader never observes a
//! partially written file, and a crash leaves at worst a stray `.tmp`.

use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Write `value` as pretty JSON to `dest` atomically.
pub async fn write_json_atomic<T: Serialize>(dest: impl AsRef<Path>, value: &T) -> StorageResult<()> {
    let dest = dest.as_ref();
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(dest, &bytes).await
}

/// Write raw bytes to `dest` atomically.
pub async fn write_bytes_atomic(dest: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::write(parent, e))?;
        }
    }

    // Temp file must live in the destination directory so the final rename
    // stays on one filesystem.
    let tmp = dest.with_extension("tmp");

    let mut file = fs::File::create(&tmp).await.map_err(|e| StorageError::write(&tmp, e))?;
    file.write_all(bytes).await.map_err(|e| StorageError::write(&tmp, e))?;
    file.sync_all().await.map_err(|e| StorageError::write(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, dest).await.map_err(|e| {
        // Best effort cleanup of the orphaned temp file.
        let _ = std::fs::remove_file(&tmp);
        StorageError::write(dest, e)
    })?;

    debug!(path = %dest.display(), bytes = bytes.len(), "Atomic write complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.json");

        write_json_atomic(&dest, &json!({"key": "value"})).await.unwrap();

        let content = fs::read_to_string(&dest).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["key"], "value");
        // No stray temp file left behind.
        assert!(!dir.path().join("out.tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite_existing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.json");

        write_json_atomic(&dest, &json!({"version": 1})).await.unwrap();
        write_json_atomic(&dest, &json!({"version": 2})).await.unwrap();

        let content = fs::read_to_string(&dest).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["version"], 2);
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("deeper").join("out.json");

        write_json_atomic(&dest, &json!([1, 2, 3])).await.unwrap();
        assert!(dest.exists());
    }
}
