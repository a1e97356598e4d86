//! Filesystem storage for exported assets.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::application::ports::{AssetSink, SinkError, StoredAsset};
use crate::domain::export::ImageFormat;
use crate::domain::tree::NodeId;

const PARTIAL_SUFFIX: &str = "part";

/// Writes assets into one directory. Files appear atomically: bytes are
/// written to a `.part` sibling which is renamed into place once complete.
#[derive(Debug, Clone)]
pub struct AssetDirectory {
    root: PathBuf,
}

impl AssetDirectory {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, file_name: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(file_name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => Err(SinkError::InvalidName {
                name: file_name.to_string(),
            }),
        }
    }

    async fn write_atomically(&self, target: &Path, bytes: &[u8]) -> Result<(), SinkError> {
        let partial = PartialFile::beside(target);

        let written = async {
            let mut file = fs::File::create(partial.path()).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(partial.path(), target).await
        }
        .await;

        written.map_err(SinkError::Io)?;
        partial.commit();
        Ok(())
    }
}

/// A `.part` sibling of a target file. Removed on drop unless committed, so a
/// failed or abandoned write leaves nothing behind.
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn beside(target: &Path) -> Self {
        let mut path = target.as_os_str().to_owned();
        path.push(".");
        path.push(PARTIAL_SUFFIX);
        Self {
            path: PathBuf::from(path),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                debug!(
                    target = "figport::storage",
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove partial file"
                );
            }
            _ => {}
        }
    }
}

#[async_trait]
impl AssetSink for AssetDirectory {
    async fn store(
        &self,
        id: &NodeId,
        file_stem: &str,
        format: ImageFormat,
        bytes: Bytes,
    ) -> Result<StoredAsset, SinkError> {
        if bytes.is_empty() {
            return Err(SinkError::EmptyPayload);
        }

        let file_name = format!("{file_stem}.{}", format.extension());
        let target = self.resolve(&file_name)?;
        self.write_atomically(&target, &bytes).await?;

        let checksum = hex::encode(Sha256::digest(&bytes));
        let size_bytes = bytes.len() as u64;
        debug!(
            target = "figport::storage",
            node_id = %id,
            path = %target.display(),
            size_bytes,
            "asset stored"
        );

        Ok(StoredAsset {
            path: target,
            checksum,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn id(value: &str) -> NodeId {
        NodeId::from(value)
    }

    #[tokio::test]
    async fn store_writes_file_and_checksum() {
        let dir = tempdir().expect("temp dir");
        let storage = AssetDirectory::new(dir.path().join("KEY")).expect("storage");

        let stored = storage
            .store(&id("1:2"), "1-2", ImageFormat::Png, Bytes::from_static(b"hello"))
            .await
            .expect("stored");

        assert_eq!(stored.path, dir.path().join("KEY").join("1-2.png"));
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(
            stored.checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        let contents = std::fs::read(&stored.path).expect("read back");
        assert_eq!(contents, b"hello");
        assert!(!dir.path().join("KEY").join("1-2.png.part").exists());
    }

    #[tokio::test]
    async fn store_overwrites_previous_export() {
        let dir = tempdir().expect("temp dir");
        let storage = AssetDirectory::new(dir.path().to_path_buf()).expect("storage");

        storage
            .store(&id("1:2"), "hero", ImageFormat::Svg, Bytes::from_static(b"<svg/>"))
            .await
            .expect("first");
        let stored = storage
            .store(&id("1:2"), "hero", ImageFormat::Svg, Bytes::from_static(b"<svg></svg>"))
            .await
            .expect("second");

        let contents = std::fs::read_to_string(&stored.path).expect("read back");
        assert_eq!(contents, "<svg></svg>");
    }

    #[tokio::test]
    async fn names_escaping_the_directory_are_rejected() {
        let dir = tempdir().expect("temp dir");
        let storage = AssetDirectory::new(dir.path().to_path_buf()).expect("storage");

        for stem in ["../escape", "/abs", "nested/file"] {
            let err = storage
                .store(&id("1:2"), stem, ImageFormat::Png, Bytes::from_static(b"x"))
                .await
                .expect_err("invalid name");
            assert!(matches!(err, SinkError::InvalidName { .. }), "{stem}");
        }
    }

    #[test]
    fn abandoned_partial_file_is_removed() {
        let dir = tempdir().expect("temp dir");
        let target = dir.path().join("1-2.png");

        let partial = PartialFile::beside(&target);
        std::fs::write(partial.path(), b"half").expect("partial write");
        let path = partial.path().to_path_buf();
        assert_eq!(path, dir.path().join("1-2.png.part"));

        drop(partial);
        assert!(!path.exists());
        assert!(!target.exists());
    }

    #[test]
    fn committed_partial_file_is_left_alone() {
        let dir = tempdir().expect("temp dir");
        let partial = PartialFile::beside(&dir.path().join("1-2.png"));
        std::fs::write(partial.path(), b"kept").expect("partial write");
        let path = partial.path().to_path_buf();

        partial.commit();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let dir = tempdir().expect("temp dir");
        let storage = AssetDirectory::new(dir.path().to_path_buf()).expect("storage");
        std::fs::create_dir(dir.path().join("taken.png")).expect("blocking dir");
        std::fs::write(dir.path().join("taken.png").join("inner"), b"x").expect("inner file");

        let err = storage
            .store(&id("1:2"), "taken", ImageFormat::Png, Bytes::from_static(b"png"))
            .await
            .expect_err("rename onto non-empty dir");
        assert!(matches!(err, SinkError::Io(_)));
        assert!(!dir.path().join("taken.png.part").exists());
    }

    #[tokio::test]
    async fn empty_payloads_are_rejected() {
        let dir = tempdir().expect("temp dir");
        let storage = AssetDirectory::new(dir.path().to_path_buf()).expect("storage");

        let err = storage
            .store(&id("1:2"), "empty", ImageFormat::Png, Bytes::new())
            .await
            .expect_err("empty");
        assert!(matches!(err, SinkError::EmptyPayload));
        assert!(!dir.path().join("empty.png").exists());
    }
}
