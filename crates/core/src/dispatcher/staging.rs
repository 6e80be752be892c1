//! Temporary files for in-memory sources.
//!
//! The prober and transcoder address sources by URL or path, so byte-buffer
//! sources are written to disk first and removed when the guard drops.

use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// A source written to a temp file. The file is deleted on drop.
#[derive(Debug)]
pub struct StagedSource {
    path: PathBuf,
}

impl StagedSource {
    pub async fn write(dir: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.src", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn location(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl Drop for StagedSource {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staged source");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_staged_source_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let staged = StagedSource::write(&dir.path().join("nested"), b"payload")
            .await
            .unwrap();
        let path = staged.path().to_path_buf();

        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(staged.location().ends_with(".src"));

        drop(staged);
        assert!(!path.exists());
    }
}
