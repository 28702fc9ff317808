use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::cache::{ArtifactCache, CachedArtifact};
use super::transport::Transport;
use crate::core::error::{StageError, StageResult};
use crate::core::maven::{Checksum, ResolvedArtifact};

/// Retrieves artifacts into the local cache, verifying published checksums.
pub struct ArtifactFetcher {
    cache: Arc<ArtifactCache>,
    transport: Arc<dyn Transport>,
}

impl ArtifactFetcher {
    pub fn new(cache: Arc<ArtifactCache>, transport: Arc<dyn Transport>) -> Self {
        Self { cache, transport }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    // ── Fetch ───────────────────────────────────────────

    /// Return the cached artifact, downloading it first when the cache has no
    /// entry or the entry no longer matches the published checksum.
    pub async fn fetch(&self, resolved: &ResolvedArtifact) -> StageResult<CachedArtifact> {
        let dest = self.cache.path_for(&resolved.descriptor);

        if let Some(hit) = self.reuse(resolved, &dest).await? {
            return Ok(hit);
        }

        let _guard = self.cache.lock_entry(&resolved.descriptor).await?;

        // Another writer may have finished while we waited.
        if let Some(hit) = self.reuse(resolved, &dest).await? {
            return Ok(hit);
        }

        let bytes = self.transport.get(&resolved.url).await?;
        let part = part_path(&dest);
        write_part(&part, &bytes).await?;

        if let Some(expected) = &resolved.checksum {
            let actual = Checksum::compute(expected.algorithm, &bytes);
            if actual.digest != expected.digest {
                discard(&part).await;
                return Err(StageError::IntegrityMismatch {
                    url: resolved.url.clone(),
                    algorithm: expected.algorithm.to_string(),
                    expected: expected.to_hex(),
                    actual: actual.to_hex(),
                });
            }
        } else {
            warn!(
                "No published checksum for {}, caching unverified",
                resolved.descriptor
            );
        }

        if let Err(source) = tokio::fs::rename(&part, &dest).await {
            discard(&part).await;
            return Err(StageError::io(&dest, source));
        }

        info!(
            "Fetched {} ({} bytes) -> {:?}",
            resolved.descriptor,
            bytes.len(),
            dest
        );
        Ok(CachedArtifact {
            resolved: resolved.clone(),
            local_path: dest,
            verified: resolved.checksum.is_some(),
        })
    }

    // ── Verify ──────────────────────────────────────────

    /// Re-hash the cached entry for `resolved` without touching the network.
    ///
    /// `None` when nothing is cached. A present entry without a published
    /// checksum, or whose bytes no longer match, reports `verified = false`.
    pub async fn verify(&self, resolved: &ResolvedArtifact) -> StageResult<Option<CachedArtifact>> {
        let dest = self.cache.path_for(&resolved.descriptor);
        if !path_exists(&dest).await {
            return Ok(None);
        }

        let verified = match &resolved.checksum {
            Some(expected) => self.cache.matches(&dest, expected).await?,
            None => false,
        };
        Ok(Some(CachedArtifact {
            resolved: resolved.clone(),
            local_path: dest,
            verified,
        }))
    }

    /// A cached entry usable as-is, if any.
    async fn reuse(
        &self,
        resolved: &ResolvedArtifact,
        dest: &Path,
    ) -> StageResult<Option<CachedArtifact>> {
        if !path_exists(dest).await {
            return Ok(None);
        }

        match &resolved.checksum {
            Some(expected) => {
                if self.cache.matches(dest, expected).await? {
                    debug!("Cache hit: {}", resolved.descriptor);
                    Ok(Some(CachedArtifact {
                        resolved: resolved.clone(),
                        local_path: dest.to_path_buf(),
                        verified: true,
                    }))
                } else {
                    warn!(
                        "Cached {} does not match its {} checksum, refetching",
                        resolved.descriptor, expected.algorithm
                    );
                    Ok(None)
                }
            }
            None => {
                debug!("Cache hit (unverified): {}", resolved.descriptor);
                Ok(Some(CachedArtifact {
                    resolved: resolved.clone(),
                    local_path: dest.to_path_buf(),
                    verified: false,
                }))
            }
        }
    }
}

/// Unique sibling of `dest` so concurrent writers never share a partial file.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(format!(".part-{}", uuid::Uuid::new_v4()));
    PathBuf::from(name)
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn write_part(part: &Path, bytes: &[u8]) -> StageResult<()> {
    if let Some(parent) = part.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StageError::io(parent, source))?;
    }

    // Drop the handle before renaming; Windows refuses to move open files.
    {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|source| StageError::io(part, source))?;
        file.write_all(bytes)
            .await
            .map_err(|source| StageError::io(part, source))?;
        file.flush()
            .await
            .map_err(|source| StageError::io(part, source))?;
    }
    Ok(())
}

async fn discard(part: &Path) {
    if let Err(source) = tokio::fs::remove_file(part).await {
        warn!("Failed to remove partial download {:?}: {}", part, source);
    }
}
