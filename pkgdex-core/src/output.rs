//! Output directory acquisition

use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// The run's output directory, created on acquisition
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Ensure `path` exists as a directory; an existing directory is fine
    pub async fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            tracing::info!("Output folder already exists: {}", path.display());
        } else {
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| CatalogError::io(&path, e))?;
            tracing::info!("Output folder created: {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("public").join("nested");

        let dir = OutputDir::acquire(&target).await.unwrap();
        assert!(target.is_dir());
        assert_eq!(dir.join("all.json"), target.join("all.json"));
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let temp = TempDir::new().unwrap();
        OutputDir::acquire(temp.path()).await.unwrap();
        OutputDir::acquire(temp.path()).await.unwrap();
        assert!(temp.path().is_dir());
    }

    #[tokio::test]
    async fn test_acquire_fails_on_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("public");
        std::fs::write(&file, "not a directory").unwrap();

        assert!(OutputDir::acquire(&file).await.is_err());
    }
}
