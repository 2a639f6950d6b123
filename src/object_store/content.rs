//! Content-addressed storage for module bytecode: every module is stored under
//! the SHA-256 of its bytes, so uploading the same module twice writes one object.
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use object_store::{path::Path, ObjectStore};
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

pub fn checksum(bytecode: &[u8]) -> Checksum {
    Checksum(Sha256::digest(bytecode).into())
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    inner: Arc<dyn ObjectStore>,
}

impl ContentStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn path_for(checksum: &Checksum) -> Path {
        Path::from(format!("{}.wasm", checksum.to_hex()))
    }

    /// Store the bytecode under its checksum. Storing the same bytes again is a no-op.
    pub async fn persist(&self, bytecode: &[u8]) -> object_store::Result<Checksum> {
        let checksum = checksum(bytecode);
        let path = Self::path_for(&checksum);

        match self.inner.head(&path).await {
            Ok(meta) if meta.size == bytecode.len() => {
                debug!("Bytecode {checksum} already stored, skipping upload");
                return Ok(checksum);
            }
            Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        debug!("Storing {} bytes of bytecode at {path}", bytecode.len());
        self.inner
            .put(&path, Bytes::copy_from_slice(bytecode))
            .await?;
        Ok(checksum)
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use object_store::{local::LocalFileSystem, memory::InMemory};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_checksum_is_deterministic() {
        let a = checksum(b"\x00asm\x01\x00\x00\x00");
        let b = checksum(b"\x00asm\x01\x00\x00\x00");
        let c = checksum(b"\x00asm\x01\x00\x00\x01");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.to_hex(), c.to_hex());

        // SHA-256 of the empty string
        assert_eq!(
            checksum(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_persist_deduplicates() {
        let inner = Arc::new(InMemory::new());
        let store = ContentStore::new(inner.clone());

        let first = store.persist(b"module-bytes").await.unwrap();
        let second = store.persist(b"module-bytes").await.unwrap();
        assert_eq!(first, second);

        store.persist(b"other-module").await.unwrap();

        let objects: Vec<_> = inner.list(None).try_collect().await.unwrap();
        assert_eq!(objects.len(), 2);

        let stored = inner
            .get(&ContentStore::path_for(&first))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored, Bytes::from_static(b"module-bytes"));
    }

    #[tokio::test]
    async fn test_persist_local_filesystem() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(Arc::new(
            LocalFileSystem::new_with_prefix(dir.path()).unwrap(),
        ));

        let checksum = store.persist(b"module-bytes").await.unwrap();
        let file = dir.path().join(format!("{}.wasm", checksum.to_hex()));
        assert_eq!(std::fs::read(file).unwrap(), b"module-bytes");

        // Idempotent on disk as well
        store.persist(b"module-bytes").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
