mod artifact;
mod checksum;
mod index;
mod metadata;
mod pom;
mod resolver;
mod version;

pub use artifact::DependencyDescriptor;
pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumHasher};
pub use index::{metadata_url, MavenIndex, RepositoryIndex};
pub use metadata::MavenMetadata;
pub use pom::{PomDependency, PomDocument};
pub use resolver::{DescriptorResolver, ResolvedArtifact};
pub use version::{compare_versions, is_snapshot, VersionRange};

/// Default repository when neither settings nor manifest name one.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
