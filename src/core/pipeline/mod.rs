// ─── Staging Pipeline ───
// Manifest → resolver → parallel fetches → platform stager.

mod retry;

pub use retry::RetryPolicy;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::downloader::{ArtifactCache, ArtifactFetcher, CachedArtifact, Transport};
use crate::core::error::StageResult;
use crate::core::http::HttpTransport;
use crate::core::manifest::DependencyManifest;
use crate::core::maven::{DescriptorResolver, MavenIndex, ResolvedArtifact};
use crate::core::platform::PlatformTag;
use crate::core::staging::{PlatformStager, StagedLayout};
use crate::core::state::StagerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    /// Cached and matching its published checksum.
    Verified,
    /// Cached, but the repository publishes no checksum.
    Unverified,
    /// Cached bytes no longer match the published checksum.
    Corrupt,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub coordinate: String,
    pub path: Option<PathBuf>,
    pub status: VerifyStatus,
}

/// Runs resolution, fetching and staging with one set of settings.
pub struct StagingPipeline {
    settings: StagerSettings,
    transport: Arc<dyn Transport>,
    fetcher: ArtifactFetcher,
}

impl StagingPipeline {
    pub fn new(settings: StagerSettings, transport: Arc<dyn Transport>) -> Self {
        let cache = Arc::new(ArtifactCache::new(settings.cache_dir.clone()));
        let fetcher = ArtifactFetcher::new(cache, transport.clone());
        Self {
            settings,
            transport,
            fetcher,
        }
    }

    /// Pipeline over HTTP with the settings' timeout.
    pub fn from_settings(settings: StagerSettings) -> StageResult<Self> {
        let transport = Arc::new(HttpTransport::new(settings.timeout())?);
        Ok(Self::new(settings, transport))
    }

    pub fn settings(&self) -> &StagerSettings {
        &self.settings
    }

    // ── Resolution ──────────────────────────────────────

    /// A resolver over the manifest's repositories (or the configured
    /// defaults) with the manifest's platform BOMs imported.
    pub async fn resolver(&self, manifest: &DependencyManifest) -> StageResult<DescriptorResolver> {
        let repositories = if manifest.repositories.is_empty() {
            self.settings.repositories.clone()
        } else {
            manifest.repositories.clone()
        };
        let index = Arc::new(MavenIndex::new(self.transport.clone()));
        let mut resolver =
            DescriptorResolver::new(repositories, index).with_retry(self.settings.retry);

        for notation in &manifest.platforms {
            resolver.import_platform(notation).await?;
        }
        Ok(resolver)
    }

    /// Every artifact the manifest needs on `targets`, sorted by descriptor.
    pub async fn resolve(
        &self,
        manifest: &DependencyManifest,
        targets: &[PlatformTag],
    ) -> StageResult<Vec<ResolvedArtifact>> {
        let resolver = self.resolver(manifest).await?;
        resolver.resolve_all(&manifest.dependencies, targets).await
    }

    // ── Fetching ────────────────────────────────────────

    /// Fetch every artifact with bounded parallelism, retrying outages.
    ///
    /// All fetches run to completion; the first failure is returned after
    /// each one has been logged. Output is sorted by descriptor.
    pub async fn fetch_all(
        &self,
        artifacts: &[ResolvedArtifact],
    ) -> StageResult<Vec<CachedArtifact>> {
        let concurrency = self.settings.concurrency.max(1);
        info!(
            "Fetching {} artifacts, concurrency={}",
            artifacts.len(),
            concurrency
        );

        let retry = self.settings.retry;
        let results: Vec<StageResult<CachedArtifact>> = stream::iter(artifacts)
            .map(|artifact| async move {
                let label = artifact.descriptor.to_string();
                retry.run(&label, || self.fetcher.fetch(artifact)).await
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut cached = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(artifact) => cached.push(artifact),
                Err(err) => {
                    warn!("Fetch failed: {}", err);
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        cached.sort_by(|a, b| a.descriptor().cmp(b.descriptor()));
        let unverified = cached.iter().filter(|a| !a.verified).count();
        if unverified > 0 {
            warn!("{} artifacts have no published checksum", unverified);
        }
        Ok(cached)
    }

    /// Re-hash the cached copies of `artifacts` without downloading.
    pub async fn verify_all(
        &self,
        artifacts: &[ResolvedArtifact],
    ) -> StageResult<Vec<VerifyReport>> {
        let mut reports = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let report = match self.fetcher.verify(artifact).await? {
                None => VerifyReport {
                    coordinate: artifact.descriptor.to_string(),
                    path: None,
                    status: VerifyStatus::Missing,
                },
                Some(cached) => {
                    let status = match (cached.verified, artifact.checksum.is_some()) {
                        (true, _) => VerifyStatus::Verified,
                        (false, true) => VerifyStatus::Corrupt,
                        (false, false) => VerifyStatus::Unverified,
                    };
                    VerifyReport {
                        coordinate: artifact.descriptor.to_string(),
                        path: Some(cached.local_path),
                        status,
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }

    // ── Staging ─────────────────────────────────────────

    /// Resolve and fetch what `platform` needs, then stage it.
    pub async fn stage(
        &self,
        manifest: &DependencyManifest,
        platform: PlatformTag,
    ) -> StageResult<StagedLayout> {
        let stager = PlatformStager::new(self.settings.staging_dir.clone(), self.settings.link_mode)
            .with_native_extraction(self.settings.extract_natives);
        // Fail on an unwritable target before any download.
        stager.prepare().await?;

        let resolved = self.resolve(manifest, &[platform]).await?;
        let cached = self.fetch_all(&resolved).await?;
        let layout = stager.stage(&cached, platform).await?;
        info!(
            "Staged {} artifacts for {} at {:?}",
            layout.entries.len(),
            platform,
            layout.root
        );
        Ok(layout)
    }
}
