use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{StageError, StageResult};

/// `maven-metadata.xml` at the artifact level: the versions a repository lists.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MavenMetadata {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Option<VersionList>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VersionList {
    #[serde(default, rename = "version")]
    pub items: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> StageResult<Self> {
        from_str(xml).map_err(|e| StageError::MetadataParse(e.to_string()))
    }

    /// Listed versions, trimmed, in document order.
    pub fn versions(&self) -> Vec<String> {
        self.versioning
            .as_ref()
            .and_then(|v| v.versions.as_ref())
            .map(|list| {
                list.items
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
