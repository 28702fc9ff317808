use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extract::extract_native_libraries;
use crate::core::downloader::CachedArtifact;
use crate::core::error::{StageError, StageResult};
use crate::core::platform::{classpath_separator, PlatformTag};

const PROBE_FILE: &str = ".nativestage-write-test";
pub const LIBRARIES_DIR: &str = "libraries";
pub const NATIVES_DIR: &str = "natives";
pub const REPORT_FILE: &str = "staged.json";

/// How cached files are placed into the staging directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Copy,
    /// Falls back to copying when the cache is on another device.
    Hardlink,
}

/// One artifact placed in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedEntry {
    pub coordinate: String,
    pub classifier: Option<String>,
    /// Relative to the staging root.
    pub path: PathBuf,
    pub verified: bool,
    pub checksum: Option<String>,
}

/// Result of staging for one platform; also written as `staged.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedLayout {
    pub platform: PlatformTag,
    pub root: PathBuf,
    pub entries: Vec<StagedEntry>,
    /// Extracted shared libraries, relative to the staging root.
    pub natives: Vec<PathBuf>,
    /// Staged jars joined with the platform's classpath separator.
    pub classpath: String,
}

/// Places the artifacts of one platform into a deterministic layout:
/// `<root>/libraries/<maven path>` plus optional `<root>/natives/`.
pub struct PlatformStager {
    root: PathBuf,
    link_mode: LinkMode,
    extract_natives: bool,
}

impl PlatformStager {
    pub fn new(root: impl Into<PathBuf>, link_mode: LinkMode) -> Self {
        Self {
            root: root.into(),
            link_mode,
            extract_natives: false,
        }
    }

    pub fn with_native_extraction(mut self, enabled: bool) -> Self {
        self.extract_natives = enabled;
        self
    }

    /// Ensure the staging directory exists and is writable.
    pub async fn prepare(&self) -> StageResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StageError::staging(&self.root, source))?;

        let probe = self.root.join(PROBE_FILE);
        match tokio::fs::write(&probe, b"probe").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                Ok(())
            }
            Err(source) => Err(StageError::staging(&self.root, source)),
        }
    }

    /// The artifacts belonging on `platform`: unclassified base artifacts and
    /// those whose natives classifier names it. Sorted by descriptor with
    /// duplicates removed, so the result depends only on the input set.
    pub fn select(artifacts: &[CachedArtifact], platform: PlatformTag) -> Vec<CachedArtifact> {
        let mut selected: Vec<CachedArtifact> = artifacts
            .iter()
            .filter(|a| platform.accepts(a.descriptor().classifier()))
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.descriptor().cmp(b.descriptor()));
        selected.dedup_by(|a, b| a.descriptor() == b.descriptor());
        selected
    }

    /// Select for `platform` and place the selection under the staging root,
    /// replacing whatever a previous run left in `libraries/` and `natives/`.
    pub async fn stage(
        &self,
        artifacts: &[CachedArtifact],
        platform: PlatformTag,
    ) -> StageResult<StagedLayout> {
        self.prepare().await?;

        let selected = Self::select(artifacts, platform);
        info!(
            "Staging {} of {} artifacts for {} into {:?}",
            selected.len(),
            artifacts.len(),
            platform,
            self.root
        );

        let libraries = self.root.join(LIBRARIES_DIR);
        let natives_dir = self.root.join(NATIVES_DIR);
        reset_dir(&libraries).await?;
        remove_dir(&natives_dir).await?;
        if self.extract_natives {
            create_dir(&natives_dir).await?;
        }

        let mut entries = Vec::with_capacity(selected.len());
        let mut classpath = Vec::new();
        let mut natives = Vec::new();

        for artifact in &selected {
            let descriptor = artifact.descriptor();
            let relative = PathBuf::from(LIBRARIES_DIR).join(descriptor.local_path());
            let dest = self.root.join(&relative);
            self.place(&artifact.local_path, &dest).await?;

            if descriptor.extension() == "jar" {
                classpath.push(dest.to_string_lossy().into_owned());
            }

            if self.extract_natives && descriptor.classifier().is_some() {
                let jar = dest.clone();
                let out = natives_dir.clone();
                let extracted =
                    tokio::task::spawn_blocking(move || extract_native_libraries(&jar, &out))
                        .await
                        .map_err(|e| StageError::Other(format!("Task join error: {e}")))??;
                for path in extracted {
                    let name = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
                    if !natives.contains(&name) {
                        natives.push(name);
                    }
                }
            }

            entries.push(StagedEntry {
                coordinate: descriptor.to_string(),
                classifier: descriptor.classifier().map(str::to_string),
                path: relative,
                verified: artifact.verified,
                checksum: artifact.resolved.checksum.as_ref().map(|c| c.to_string()),
            });
        }
        natives.sort();

        let layout = StagedLayout {
            platform,
            root: self.root.clone(),
            entries,
            natives,
            classpath: classpath.join(classpath_separator(platform.os)),
        };

        let report = self.root.join(REPORT_FILE);
        let payload = serde_json::to_vec_pretty(&layout)?;
        tokio::fs::write(&report, payload)
            .await
            .map_err(|source| StageError::staging(&report, source))?;

        Ok(layout)
    }

    async fn place(&self, source: &Path, dest: &Path) -> StageResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::staging(parent, e))?;
        }

        if self.link_mode == LinkMode::Hardlink {
            match tokio::fs::hard_link(source, dest).await {
                Ok(()) => {
                    debug!("Linked {:?} -> {:?}", source, dest);
                    return Ok(());
                }
                Err(e) => warn!("Hard link {:?} failed ({}), copying instead", dest, e),
            }
        }

        tokio::fs::copy(source, dest)
            .await
            .map_err(|e| StageError::staging(dest, e))?;
        debug!("Copied {:?} -> {:?}", source, dest);
        Ok(())
    }
}

async fn remove_dir(dir: &Path) -> StageResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageError::staging(dir, e)),
    }
}

async fn create_dir(dir: &Path) -> StageResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StageError::staging(dir, e))
}

async fn reset_dir(dir: &Path) -> StageResult<()> {
    remove_dir(dir).await?;
    create_dir(dir).await
}
