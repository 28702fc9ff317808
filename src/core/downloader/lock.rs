use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::core::error::{StageError, StageResult};

/// Locks older than this are considered abandoned.
const LOCK_STALE_SECS: i64 = 10 * 60;
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize, Deserialize)]
struct LockOwner {
    pid: u32,
    timestamp: i64,
}

/// Cross-process write lock on one cache entry. Removed on drop.
#[derive(Debug)]
pub struct CacheLockGuard {
    path: PathBuf,
}

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, source);
        }
    }
}

/// Create `lock_path` exclusively, waiting while another writer holds it.
pub async fn acquire_cache_lock(lock_path: &Path) -> StageResult<CacheLockGuard> {
    if let Some(parent) = lock_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StageError::io(parent, source))?;
    }

    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(lock_path)
            .await
        {
            Ok(mut file) => {
                let owner = LockOwner {
                    pid: std::process::id(),
                    timestamp: Utc::now().timestamp(),
                };
                let payload = serde_json::to_vec(&owner)?;
                file.write_all(&payload)
                    .await
                    .map_err(|source| StageError::io(lock_path, source))?;
                return Ok(CacheLockGuard {
                    path: lock_path.to_path_buf(),
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                cleanup_stale_lock(lock_path).await;
                if attempts % 50 == 0 {
                    info!("Waiting for cache lock at {:?}", lock_path);
                }
                tokio::time::sleep(LOCK_POLL_INTERVAL).await;
            }
            Err(source) => return Err(StageError::io(lock_path, source)),
        }
    }
}

/// Remove the lock if its owner is gone or it has outlived `LOCK_STALE_SECS`.
async fn cleanup_stale_lock(lock_path: &Path) {
    let Ok(content) = tokio::fs::read_to_string(lock_path).await else {
        return;
    };
    // A lock being written right now may still be empty.
    let Ok(owner) = serde_json::from_str::<LockOwner>(&content) else {
        return;
    };

    let expired = Utc::now().timestamp().saturating_sub(owner.timestamp) > LOCK_STALE_SECS;

    #[cfg(target_os = "linux")]
    let dead = !PathBuf::from(format!("/proc/{}", owner.pid)).exists();
    #[cfg(not(target_os = "linux"))]
    let dead = false;

    if !(expired || dead) {
        return;
    }

    // Another waiter may already have reclaimed it and taken a fresh lock.
    match tokio::fs::read_to_string(lock_path).await {
        Ok(current) if current == content => {}
        _ => return,
    }
    warn!(
        "Reclaiming stale cache lock {:?} (pid {}, expired={}, dead={})",
        lock_path, owner.pid, expired, dead
    );
    match tokio::fs::remove_file(lock_path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("Failed to remove stale lock {:?}: {}", lock_path, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_removes_lock_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jar.lock");

        let guard = acquire_cache_lock(&path).await.unwrap();
        assert!(path.exists());
        drop(guard);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jar.lock");
        let abandoned = LockOwner {
            pid: std::process::id(),
            timestamp: Utc::now().timestamp() - LOCK_STALE_SECS - 60,
        };
        std::fs::write(&path, serde_json::to_vec(&abandoned).unwrap()).unwrap();

        let guard = tokio::time::timeout(Duration::from_secs(5), acquire_cache_lock(&path))
            .await
            .expect("stale lock should be reclaimed")
            .unwrap();
        drop(guard);
    }

    #[tokio::test]
    async fn live_lock_is_not_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jar.lock");
        let _fresh = acquire_cache_lock(&path).await.unwrap();

        cleanup_stale_lock(&path).await;
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let owner: LockOwner = serde_json::from_str(&content).unwrap();
        assert_eq!(owner.pid, std::process::id());
    }

    #[tokio::test]
    async fn concurrent_reclaimers_leave_one_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jar.lock");
        let abandoned = LockOwner {
            pid: std::process::id(),
            timestamp: Utc::now().timestamp() - LOCK_STALE_SECS - 60,
        };
        std::fs::write(&path, serde_json::to_vec(&abandoned).unwrap()).unwrap();

        tokio::join!(cleanup_stale_lock(&path), cleanup_stale_lock(&path));
        assert!(!path.exists());

        let guard = acquire_cache_lock(&path).await.unwrap();
        cleanup_stale_lock(&path).await;
        assert!(path.exists());
        drop(guard);
    }

    #[tokio::test]
    async fn live_lock_blocks_second_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jar.lock");
        let _held = acquire_cache_lock(&path).await.unwrap();

        let second =
            tokio::time::timeout(Duration::from_millis(300), acquire_cache_lock(&path)).await;
        assert!(second.is_err());
    }
}
