//! In-memory repository used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::downloader::Transport;
use crate::core::error::{StageError, StageResult};
use crate::core::maven::{metadata_url, Checksum, ChecksumAlgorithm, DependencyDescriptor};

pub const REPO: &str = "https://repo.test/maven2";

/// Serves registered bodies, records every request, and can fail a URL a
/// fixed number of times with `NetworkUnavailable`.
#[derive(Default)]
pub struct MemoryTransport {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    outages: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.bodies.lock().unwrap().insert(url.into(), body.into());
    }

    pub fn fail_times(&self, url: impl Into<String>, times: u32) {
        self.outages.lock().unwrap().insert(url.into(), times);
    }

    /// Publish an artifact and its SHA-1 sidecar under `repo`.
    pub fn publish(&self, repo: &str, descriptor: &DependencyDescriptor, body: &[u8]) {
        let url = descriptor.url(repo);
        let sha1 = Checksum::compute(ChecksumAlgorithm::Sha1, body);
        self.serve(format!("{url}.sha1"), sha1.to_hex());
        self.serve(url, body.to_vec());
    }

    /// Publish an artifact without any checksum sidecar.
    pub fn publish_unsigned(&self, repo: &str, descriptor: &DependencyDescriptor, body: &[u8]) {
        self.serve(descriptor.url(repo), body.to_vec());
    }

    /// Publish `maven-metadata.xml` listing `versions`.
    pub fn publish_versions(&self, repo: &str, group: &str, artifact: &str, versions: &[&str]) {
        let listed: String = versions
            .iter()
            .map(|v| format!("<version>{v}</version>"))
            .collect();
        let xml = format!(
            "<metadata><groupId>{group}</groupId><artifactId>{artifact}</artifactId>\
             <versioning><versions>{listed}</versions></versioning></metadata>"
        );
        let url = metadata_url(repo, group, artifact);
        self.serve(url, xml);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str) -> StageResult<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        {
            let mut outages = self.outages.lock().unwrap();
            if let Some(remaining) = outages.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StageError::NetworkUnavailable {
                        url: url.to_string(),
                        reason: "simulated outage".into(),
                    });
                }
            }
        }

        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| StageError::NotFound {
                url: url.to_string(),
            })
    }

    async fn exists(&self, url: &str) -> StageResult<bool> {
        self.requests.lock().unwrap().push(format!("HEAD {url}"));
        Ok(self.bodies.lock().unwrap().contains_key(url))
    }
}
