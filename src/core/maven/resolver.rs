use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::artifact::DependencyDescriptor;
use super::checksum::{Checksum, ChecksumAlgorithm};
use super::index::RepositoryIndex;
use super::pom::PomDocument;
use super::version::VersionRange;
use crate::core::error::{StageError, StageResult};
use crate::core::manifest::DependencyRequest;
use crate::core::pipeline::RetryPolicy;
use crate::core::platform::{self, PlatformTag, PLATFORM_PLACEHOLDER};

/// A descriptor bound to the URL it is fetched from and its published digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedArtifact {
    pub descriptor: DependencyDescriptor,
    pub url: String,
    /// `None` only when the owning repository publishes no checksum sidecar.
    pub checksum: Option<Checksum>,
}

/// What one repository says about an artifact's versions.
/// `None` means the repository publishes no metadata for it.
type Listing = Vec<(String, Option<Vec<String>>)>;

/// Maps logical dependencies to descriptors and descriptors to fetchable
/// artifacts, querying the repositories read-only.
pub struct DescriptorResolver {
    /// Ordered list of repository base URLs to search.
    repositories: Vec<String>,
    index: Arc<dyn RepositoryIndex>,
    retry: RetryPolicy,
    /// `group:artifact` → version pinned by an imported platform BOM.
    managed: BTreeMap<String, String>,
    listings: Mutex<HashMap<String, Arc<Listing>>>,
}

impl DescriptorResolver {
    pub fn new(repositories: Vec<String>, index: Arc<dyn RepositoryIndex>) -> Self {
        Self {
            repositories: repositories
                .into_iter()
                .map(|r| r.trim_end_matches('/').to_string())
                .collect(),
            index,
            retry: RetryPolicy::default(),
            managed: BTreeMap::new(),
            listings: Mutex::new(HashMap::new()),
        }
    }

    /// Backoff applied to BOM imports and to each resolve/locate step of
    /// `resolve_all`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Import the `dependencyManagement` of a platform BOM.
    ///
    /// Versions already pinned by an earlier platform are kept.
    pub async fn import_platform(&mut self, notation: &str) -> StageResult<usize> {
        let retry = self.retry;
        let managed = retry
            .run(notation, || self.fetch_platform(notation))
            .await?;
        let added = self.pin_versions(managed);
        info!("Imported platform {} ({} managed versions)", notation, added);
        Ok(added)
    }

    async fn fetch_platform(&self, notation: &str) -> StageResult<BTreeMap<String, String>> {
        let bom = DependencyDescriptor::parse(notation)?.with_packaging("pom");

        for repo in &self.repositories {
            if let Some(xml) = self.index.pom(repo, &bom).await? {
                return Ok(PomDocument::parse(&xml)?.managed_versions());
            }
        }
        Err(StageError::UnresolvedDependency {
            coordinate: notation.to_string(),
            range: bom.version().to_string(),
            reason: "platform BOM not found in any repository".into(),
        })
    }

    fn pin_versions(&mut self, managed: BTreeMap<String, String>) -> usize {
        let mut added = 0;
        for (coordinate, version) in managed {
            if !self.managed.contains_key(&coordinate) {
                self.managed.insert(coordinate, version);
                added += 1;
            }
        }
        added
    }

    pub fn managed_version(&self, group: &str, artifact: &str) -> Option<&str> {
        self.managed
            .get(&format!("{group}:{artifact}"))
            .map(String::as_str)
    }

    /// Produce one descriptor per required classifier of `request`.
    ///
    /// `targets` are the platforms `${platform}` classifiers expand for.
    /// A request whose rules allow none of the targets yields nothing.
    /// Output is sorted.
    pub async fn resolve(
        &self,
        request: &DependencyRequest,
        targets: &[PlatformTag],
    ) -> StageResult<Vec<DependencyDescriptor>> {
        let allowed: Vec<PlatformTag> = targets
            .iter()
            .copied()
            .filter(|t| platform::is_allowed(&request.rules, t))
            .collect();
        if !request.rules.is_empty() && allowed.is_empty() {
            debug!("Skipping {} (no target platform allowed)", request.coordinate());
            return Ok(vec![]);
        }

        let raw_range = match request.version.as_deref() {
            Some(v) => v.to_string(),
            None => self
                .managed_version(&request.group, &request.artifact)
                .map(str::to_string)
                .ok_or_else(|| StageError::UnresolvedDependency {
                    coordinate: request.coordinate(),
                    range: "<none>".into(),
                    reason: "no version given and no platform pins one".into(),
                })?,
        };
        let range = VersionRange::parse(&raw_range)?;
        let version = self.select_version(request, &range).await?;

        let extension = request.extension.as_deref().unwrap_or("jar");
        let mut classifiers: BTreeSet<Option<String>> = BTreeSet::new();
        if request.include_base {
            classifiers.insert(None);
        }
        for template in &request.classifiers {
            if template.contains(PLATFORM_PLACEHOLDER) {
                for target in &allowed {
                    classifiers.insert(Some(
                        template.replace(PLATFORM_PLACEHOLDER, &target.classifier_suffix()),
                    ));
                }
            } else {
                classifiers.insert(Some(template.clone()));
            }
        }

        let mut descriptors = classifiers
            .into_iter()
            .map(|classifier| {
                DependencyDescriptor::with_extension(
                    &request.group,
                    &request.artifact,
                    &version,
                    classifier,
                    extension,
                )
            })
            .collect::<StageResult<Vec<_>>>()?;
        descriptors.sort();
        descriptors.dedup();

        debug!(
            "Resolved {} {} -> {} ({} descriptors)",
            request.coordinate(),
            range,
            version,
            descriptors.len()
        );
        Ok(descriptors)
    }

    async fn select_version(
        &self,
        request: &DependencyRequest,
        range: &VersionRange,
    ) -> StageResult<String> {
        let listing = self.listing(&request.group, &request.artifact).await?;
        let unresolved = |reason: String| StageError::UnresolvedDependency {
            coordinate: request.coordinate(),
            range: range.to_string(),
            reason,
        };

        let listed: BTreeSet<&str> = listing
            .iter()
            .filter_map(|(_, versions)| versions.as_ref())
            .flatten()
            .map(String::as_str)
            .collect();
        let unlisted_repo = listing.iter().any(|(_, versions)| versions.is_none());

        if let Some(exact) = range.exact_version() {
            // Repositories without metadata may still host the exact version;
            // `locate` probes them.
            if listed.contains(exact) || unlisted_repo {
                return Ok(exact.to_string());
            }
            return Err(unresolved(format!(
                "version is not listed by any repository ({} known)",
                listed.len()
            )));
        }

        if listed.is_empty() {
            return Err(unresolved("no repository lists versions".into()));
        }
        range
            .select(listed.iter().copied())
            .map(str::to_string)
            .ok_or_else(|| unresolved(format!("none of {} listed versions match", listed.len())))
    }

    async fn listing(&self, group: &str, artifact: &str) -> StageResult<Arc<Listing>> {
        let key = format!("{group}:{artifact}");
        let cached = self.lock_listings().get(&key).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let mut listing = Vec::with_capacity(self.repositories.len());
        for repo in &self.repositories {
            let versions = self.index.versions(repo, group, artifact).await?;
            listing.push((repo.clone(), versions));
        }
        let listing = Arc::new(listing);
        self.lock_listings().insert(key, listing.clone());
        Ok(listing)
    }

    fn lock_listings(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Listing>>> {
        // The map only ever holds complete entries, so a poisoned lock is still usable.
        self.listings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind `descriptor` to its owning repository and published checksum.
    ///
    /// Repositories listing the version are tried first, then repositories
    /// without metadata, each in configured order.
    pub async fn locate(&self, descriptor: &DependencyDescriptor) -> StageResult<ResolvedArtifact> {
        let listing = self
            .listing(descriptor.group(), descriptor.artifact())
            .await?;

        let owners = listing.iter().filter(|(_, versions)| {
            versions
                .as_ref()
                .is_some_and(|v| v.iter().any(|x| x == descriptor.version()))
        });
        let unlisted = listing.iter().filter(|(_, versions)| versions.is_none());

        let mut classifier_missing = false;
        for (repo, versions) in owners.chain(unlisted) {
            if let Some(checksum) = self.published_checksum(repo, descriptor).await? {
                return Ok(ResolvedArtifact {
                    descriptor: descriptor.clone(),
                    url: descriptor.url(repo),
                    checksum: Some(checksum),
                });
            }
            if versions.is_none() {
                continue;
            }
            // The version is listed, but this classifier may never have been built.
            if self.index.artifact_exists(repo, descriptor).await? {
                warn!("{} publishes no checksum for {}", repo, descriptor);
                return Ok(ResolvedArtifact {
                    descriptor: descriptor.clone(),
                    url: descriptor.url(repo),
                    checksum: None,
                });
            }
            debug!("{} lists {} but does not host {}", repo, descriptor.version(), descriptor);
            classifier_missing = true;
        }

        let reason = if classifier_missing && descriptor.classifier().is_some() {
            "classifier not published"
        } else {
            "not published by any repository"
        };
        Err(StageError::UnresolvedDependency {
            coordinate: descriptor.to_string(),
            range: descriptor.version().to_string(),
            reason: reason.into(),
        })
    }

    async fn published_checksum(
        &self,
        repo: &str,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<Option<Checksum>> {
        for algorithm in ChecksumAlgorithm::PREFERENCE {
            if let Some(checksum) = self.index.checksum(repo, descriptor, algorithm).await? {
                return Ok(Some(checksum));
            }
        }
        Ok(None)
    }

    /// Resolve and locate every request; the result is sorted and deduplicated.
    pub async fn resolve_all(
        &self,
        requests: &[DependencyRequest],
        targets: &[PlatformTag],
    ) -> StageResult<Vec<ResolvedArtifact>> {
        let retry = self.retry;
        let mut descriptors = BTreeSet::new();
        for request in requests {
            let label = request.coordinate();
            descriptors.extend(retry.run(&label, || self.resolve(request, targets)).await?);
        }

        let mut resolved = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let label = descriptor.to_string();
            resolved.push(retry.run(&label, || self.locate(descriptor)).await?);
        }
        info!(
            "Resolved {} requests into {} artifacts for {} platform(s)",
            requests.len(),
            resolved.len(),
            targets.len()
        );
        Ok(resolved)
    }
}
