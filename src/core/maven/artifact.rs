use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::core::error::{StageError, StageResult};

const DEFAULT_EXTENSION: &str = "jar";

/// One concrete artifact coordinate.
///
/// Immutable once constructed; the accessors are the only way to read it.
///
/// Supported notations:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///   `group:artifact:version:classifier@extension`
///   `group:artifact:version@extension`
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyDescriptor {
    group: String,
    artifact: String,
    version: String,
    classifier: Option<String>,
    extension: String,
}

impl DependencyDescriptor {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
        classifier: Option<String>,
    ) -> StageResult<Self> {
        Self::with_extension(group, artifact, version, classifier, DEFAULT_EXTENSION)
    }

    pub fn with_extension(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
        classifier: Option<String>,
        extension: impl Into<String>,
    ) -> StageResult<Self> {
        let descriptor = Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            classifier: classifier.filter(|c| !c.is_empty()),
            extension: extension.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse a Maven notation string.
    ///
    /// ```
    /// # use nativestage_lib::core::maven::DependencyDescriptor;
    /// let d = DependencyDescriptor::parse("org.lwjgl:lwjgl:3.3.2:natives-windows").unwrap();
    /// assert_eq!(d.classifier(), Some("natives-windows"));
    /// ```
    pub fn parse(notation: &str) -> StageResult<Self> {
        let (coord_part, extension) = match notation.rfind('@') {
            Some(idx) => (&notation[..idx], &notation[idx + 1..]),
            None => (notation, DEFAULT_EXTENSION),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        let classifier = match parts.len() {
            3 => None,
            4 => Some(parts[3].to_string()),
            _ => return Err(StageError::InvalidCoordinate(notation.to_string())),
        };

        Self::with_extension(parts[0], parts[1], parts[2], classifier, extension)
            .map_err(|_| StageError::InvalidCoordinate(notation.to_string()))
    }

    fn validate(&self) -> StageResult<()> {
        let mut fields = vec![
            self.group.as_str(),
            self.artifact.as_str(),
            self.version.as_str(),
            self.extension.as_str(),
        ];
        if let Some(classifier) = &self.classifier {
            fields.push(classifier);
        }

        let bad_char = |c: char| c.is_whitespace() || matches!(c, ':' | '/' | '\\' | '@');
        let invalid = fields
            .iter()
            .any(|f| f.is_empty() || f.contains(bad_char) || *f == "..");
        if invalid {
            return Err(StageError::InvalidCoordinate(self.to_string()));
        }
        Ok(())
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `org.lwjgl` → `org/lwjgl`.
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// `artifact-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// `<repo>/<group_path>/<artifact>/<version>/<filename>`
    pub fn url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact,
            self.version,
            self.filename()
        )
    }

    /// Maven local-repository layout, relative to a cache or staging root.
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.group_path())
            .join(&self.artifact)
            .join(&self.version)
            .join(self.filename())
    }

    /// Same coordinate with another extension (e.g. `pom` for a BOM).
    pub fn with_packaging(&self, extension: &str) -> Self {
        let mut clone = self.clone();
        clone.extension = extension.to_string();
        clone
    }

    /// Key used to serialize cache writes; one per descriptor.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(c) => write!(
                f,
                "{}:{}:{}:{}@{}",
                self.group, self.artifact, self.version, c, self.extension
            ),
            None => write!(
                f,
                "{}:{}:{}@{}",
                self.group, self.artifact, self.version, self.extension
            ),
        }
    }
}
