// ─── Dependency Manifest ───
// The build's input: logical dependencies with version requirements and the
// classifiers they need.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{StageError, StageResult};
use crate::core::maven::VersionRange;
use crate::core::platform::PlatformRule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyManifest {
    /// Repositories searched in order; the settings' defaults apply when empty.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Platform BOM coordinates (`group:artifact:version`) supplying versions.
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
}

/// One logical dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyRequest {
    pub group: String,
    pub artifact: String,
    /// Version or range; may be omitted when a platform BOM pins it.
    #[serde(default)]
    pub version: Option<String>,
    /// Extra classifiers; `${platform}` expands per target platform.
    #[serde(default)]
    pub classifiers: Vec<String>,
    /// Whether the unclassified artifact is required too.
    #[serde(default = "default_include_base")]
    pub include_base: bool,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub rules: Vec<PlatformRule>,
}

fn default_include_base() -> bool {
    true
}

impl DependencyRequest {
    pub fn new(group: &str, artifact: &str, version: Option<&str>) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.map(str::to_string),
            classifiers: Vec::new(),
            include_base: true,
            extension: None,
            rules: Vec::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifiers.push(classifier.to_string());
        self
    }

    /// `group:artifact`, the key platform BOMs pin versions under.
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

impl DependencyManifest {
    pub fn parse(json: &str) -> StageResult<Self> {
        let manifest: DependencyManifest = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub async fn load(path: &Path) -> StageResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StageError::io(path, source))?;
        let manifest = Self::parse(&raw)?;
        info!(
            "Loaded manifest {:?}: {} dependencies, {} platforms",
            path,
            manifest.dependencies.len(),
            manifest.platforms.len()
        );
        Ok(manifest)
    }

    fn validate(&self) -> StageResult<()> {
        for dep in &self.dependencies {
            if dep.group.trim().is_empty() || dep.artifact.trim().is_empty() {
                return Err(StageError::Config(format!(
                    "dependency {:?} needs both group and artifact",
                    dep.coordinate()
                )));
            }
            if let Some(version) = &dep.version {
                VersionRange::parse(version)?;
            }
            if !dep.include_base && dep.classifiers.is_empty() {
                return Err(StageError::Config(format!(
                    "dependency {} excludes its base artifact but names no classifier",
                    dep.coordinate()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_with_defaults() {
        let manifest = DependencyManifest::parse(
            r#"{
                "platforms": ["org.lwjgl:lwjgl-bom:3.3.2"],
                "dependencies": [
                    { "group": "org.lwjgl", "artifact": "lwjgl",
                      "classifiers": ["natives-${platform}"] },
                    { "group": "org.lwjgl", "artifact": "lwjgl-vulkan", "version": "[3.3,3.4)",
                      "rules": [{ "action": "allow", "os": { "name": "osx" } }] }
                ]
            }"#,
        )
        .unwrap();

        assert!(manifest.repositories.is_empty());
        assert_eq!(manifest.dependencies.len(), 2);
        let lwjgl = &manifest.dependencies[0];
        assert!(lwjgl.include_base);
        assert_eq!(lwjgl.version, None);
        assert_eq!(lwjgl.coordinate(), "org.lwjgl:lwjgl");
        assert_eq!(manifest.dependencies[1].rules.len(), 1);
    }

    #[test]
    fn rejects_invalid_ranges_and_empty_requests() {
        let bad_range = r#"{ "dependencies": [
            { "group": "org.lwjgl", "artifact": "lwjgl", "version": "[3.3" } ] }"#;
        assert!(DependencyManifest::parse(bad_range).is_err());

        let nothing_requested = r#"{ "dependencies": [
            { "group": "org.lwjgl", "artifact": "lwjgl", "include_base": false } ] }"#;
        assert!(DependencyManifest::parse(nothing_requested).is_err());
    }
}
