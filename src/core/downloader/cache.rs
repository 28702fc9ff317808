use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::sync::OwnedMutexGuard;

use super::lock::{acquire_cache_lock, CacheLockGuard};
use crate::core::error::{StageError, StageResult};
use crate::core::maven::{Checksum, DependencyDescriptor, ResolvedArtifact};

const HASH_CHUNK: usize = 64 * 1024;

/// An artifact present in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedArtifact {
    pub resolved: ResolvedArtifact,
    pub local_path: PathBuf,
    /// True only when the bytes on disk matched the published checksum.
    pub verified: bool,
}

impl CachedArtifact {
    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.resolved.descriptor
    }
}

/// Held while writing one cache entry: the in-process slot plus the lock file
/// shared with other processes using the same cache.
pub struct EntryWriteGuard {
    _file: CacheLockGuard,
    _slot: OwnedMutexGuard<()>,
}

/// Local Maven-layout cache: `<root>/<group path>/<artifact>/<version>/<file>`.
pub struct ArtifactCache {
    root: PathBuf,
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, descriptor: &DependencyDescriptor) -> PathBuf {
        self.root.join(descriptor.local_path())
    }

    fn lock_path_for(&self, descriptor: &DependencyDescriptor) -> PathBuf {
        let mut path = self.path_for(descriptor).into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Serialize writers of `descriptor`. Tasks in this process queue on an
    /// async mutex; other processes are kept out by the lock file.
    pub async fn lock_entry(
        &self,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<EntryWriteGuard> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(descriptor.cache_key())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let slot = slot.lock_owned().await;
        let file = acquire_cache_lock(&self.lock_path_for(descriptor)).await?;
        Ok(EntryWriteGuard {
            _file: file,
            _slot: slot,
        })
    }

    /// Hash `path` under the checksum's algorithm and compare.
    /// A missing file is simply not a match.
    pub async fn matches(&self, path: &Path, expected: &Checksum) -> StageResult<bool> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(StageError::io(path, source)),
        };

        let mut hasher = expected.algorithm.hasher();
        let mut buf = vec![0_u8; HASH_CHUNK];
        loop {
            let read = file
                .read(&mut buf)
                .await
                .map_err(|source| StageError::io(path, source))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hasher.finalize() == expected.digest)
    }
}
