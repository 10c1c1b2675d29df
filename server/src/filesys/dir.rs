//! Directory operations

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs;

use crate::errors::DeployError;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), DeployError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), DeployError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Count the entries directly inside the directory
    pub async fn entry_count(&self) -> Result<usize, DeployError> {
        let mut count = 0;
        let mut entries = fs::read_dir(&self.path).await?;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> crate::filesys::file::File {
        crate::filesys::file::File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Create a scoped temporary directory.
    ///
    /// The name carries a millisecond timestamp so concurrent deploys get
    /// distinct directories. The caller owns removal on all exit paths.
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, DeployError> {
        let token = chrono::Utc::now().timestamp_millis();
        let temp_dir = std::env::temp_dir().join(format!("{}-{}", prefix, token));
        fs::create_dir_all(&temp_dir).await?;
        Ok(Dir::new(temp_dir))
    }
}

/// Recursively copy a directory tree, preserving structure
pub fn copy_dir<'a>(
    source: &'a Path,
    destination: &'a Path,
) -> Pin<Box<dyn Future<Output = Result<(), DeployError>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir_all(destination).await?;

        let mut entries = fs::read_dir(source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = destination.join(entry.file_name());
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                copy_dir(&entry.path(), &target).await?;
            } else {
                fs::copy(entry.path(), &target).await?;
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_dir_preserves_structure() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("src");
        fs::create_dir_all(source.join("sub/deep")).await.unwrap();
        fs::write(source.join("top.txt"), b"top").await.unwrap();
        fs::write(source.join("sub/deep/leaf.txt"), b"leaf").await.unwrap();

        let dest = root.path().join("dst");
        copy_dir(&source, &dest).await.unwrap();

        assert_eq!(fs::read(dest.join("top.txt")).await.unwrap(), b"top");
        assert_eq!(fs::read(dest.join("sub/deep/leaf.txt")).await.unwrap(), b"leaf");
    }

    #[tokio::test]
    async fn test_entry_count() {
        let root = tempfile::tempdir().unwrap();
        let dir = Dir::new(root.path());
        assert_eq!(dir.entry_count().await.unwrap(), 0);

        fs::write(root.path().join("a"), b"").await.unwrap();
        fs::create_dir(root.path().join("b")).await.unwrap();
        assert_eq!(dir.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_dir_is_ok() {
        let dir = Dir::new("/nonexistent/deploy-webhook-test");
        assert!(dir.delete().await.is_ok());
    }
}
