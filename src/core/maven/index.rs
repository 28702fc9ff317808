use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::artifact::DependencyDescriptor;
use super::checksum::{Checksum, ChecksumAlgorithm};
use super::metadata::MavenMetadata;
use crate::core::downloader::Transport;
use crate::core::error::{StageError, StageResult};

/// Read-only view of a single remote repository.
///
/// Every method answers `Ok(None)` when the repository does not publish the
/// requested document.
#[async_trait]
pub trait RepositoryIndex: Send + Sync {
    async fn versions(
        &self,
        repository: &str,
        group: &str,
        artifact: &str,
    ) -> StageResult<Option<Vec<String>>>;

    async fn checksum(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
        algorithm: ChecksumAlgorithm,
    ) -> StageResult<Option<Checksum>>;

    async fn pom(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<Option<String>>;

    async fn artifact_exists(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<bool>;
}

/// Index over the standard Maven 2 repository layout.
pub struct MavenIndex {
    transport: Arc<dyn Transport>,
}

impl MavenIndex {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn get_text(&self, url: &str) -> StageResult<Option<String>> {
        match self.transport.get(url).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(StageError::NotFound { .. }) => {
                debug!("Not published: {}", url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

pub fn metadata_url(repository: &str, group: &str, artifact: &str) -> String {
    format!(
        "{}/{}/{}/maven-metadata.xml",
        repository.trim_end_matches('/'),
        group.replace('.', "/"),
        artifact
    )
}

#[async_trait]
impl RepositoryIndex for MavenIndex {
    async fn versions(
        &self,
        repository: &str,
        group: &str,
        artifact: &str,
    ) -> StageResult<Option<Vec<String>>> {
        let url = metadata_url(repository, group, artifact);
        match self.get_text(&url).await? {
            Some(xml) => Ok(Some(MavenMetadata::parse(&xml)?.versions())),
            None => Ok(None),
        }
    }

    async fn checksum(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
        algorithm: ChecksumAlgorithm,
    ) -> StageResult<Option<Checksum>> {
        let url = format!("{}.{}", descriptor.url(repository), algorithm.extension());
        match self.get_text(&url).await? {
            Some(body) => Ok(Some(Checksum::parse_sidecar(algorithm, &body)?)),
            None => Ok(None),
        }
    }

    async fn pom(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<Option<String>> {
        let pom = descriptor.with_packaging("pom");
        self.get_text(&pom.url(repository)).await
    }

    async fn artifact_exists(
        &self,
        repository: &str,
        descriptor: &DependencyDescriptor,
    ) -> StageResult<bool> {
        self.transport.exists(&descriptor.url(repository)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{MemoryTransport, REPO};

    #[tokio::test]
    async fn missing_documents_are_none_not_errors() {
        let transport = Arc::new(MemoryTransport::new());
        let index = MavenIndex::new(transport.clone());
        let d = DependencyDescriptor::parse("org.lwjgl:lwjgl:3.3.2").unwrap();

        assert!(index.versions(REPO, "org.lwjgl", "lwjgl").await.unwrap().is_none());
        assert!(index
            .checksum(REPO, &d, ChecksumAlgorithm::Sha1)
            .await
            .unwrap()
            .is_none());
        assert!(index.pom(REPO, &d).await.unwrap().is_none());
        assert!(!index.artifact_exists(REPO, &d).await.unwrap());
    }

    #[tokio::test]
    async fn reads_published_checksum_and_versions() {
        let transport = Arc::new(MemoryTransport::new());
        let d = DependencyDescriptor::parse("org.lwjgl:lwjgl:3.3.2").unwrap();
        transport.publish(REPO, &d, b"jar bytes");
        transport.publish_versions(REPO, "org.lwjgl", "lwjgl", &["3.3.1", "3.3.2"]);
        let index = MavenIndex::new(transport.clone());

        let versions = index.versions(REPO, "org.lwjgl", "lwjgl").await.unwrap();
        assert_eq!(versions, Some(vec!["3.3.1".to_string(), "3.3.2".to_string()]));

        let checksum = index
            .checksum(REPO, &d, ChecksumAlgorithm::Sha1)
            .await
            .unwrap()
            .unwrap();
        assert!(checksum.matches(b"jar bytes"));
        assert!(index.artifact_exists(REPO, &d).await.unwrap());
    }

    #[tokio::test]
    async fn outages_propagate() {
        let transport = Arc::new(MemoryTransport::new());
        let url = metadata_url(REPO, "org.lwjgl", "lwjgl");
        transport.fail_times(url, 1);
        let index = MavenIndex::new(transport);

        let err = index.versions(REPO, "org.lwjgl", "lwjgl").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
