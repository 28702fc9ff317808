use std::path::PathBuf;
use thiserror::Error;

/// Central error type for resolution, fetching and staging.
/// Every module returns `Result<T, StageError>`.
#[derive(Debug, Error)]
pub enum StageError {
    // ── Resolution ──────────────────────────────────────
    #[error("Unresolved dependency {coordinate} ({range}): {reason}")]
    UnresolvedDependency {
        coordinate: String,
        range: String,
        reason: String,
    },

    #[error("Invalid Maven coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid version range: {0}")]
    InvalidVersionRange(String),

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {url}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        url: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    // ── Network ─────────────────────────────────────────
    #[error("Network unavailable for {url}: {reason}")]
    NetworkUnavailable { url: String, reason: String },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Not found: {url}")]
    NotFound { url: String },

    // ── Staging ─────────────────────────────────────────
    #[error("Staging failed at {path:?}: {source}")]
    StagingIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Parsing ─────────────────────────────────────────
    #[error("POM parse error: {0}")]
    PomParse(String),

    #[error("Repository metadata parse error: {0}")]
    MetadataParse(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type StageResult<T> = Result<T, StageError>;

/// Coarse classification surfaced to the build orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnresolvedDependency,
    IntegrityMismatch,
    NetworkUnavailable,
    StagingIo,
    /// Anything else: malformed input, cache I/O, unexpected HTTP status.
    Fatal,
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::UnresolvedDependency { .. } => ErrorKind::UnresolvedDependency,
            StageError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            StageError::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            StageError::StagingIo { .. } => ErrorKind::StagingIo,
            _ => ErrorKind::Fatal,
        }
    }

    /// Only transport failures may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NetworkUnavailable
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::StagingIo {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for StageError {
    fn from(source: std::io::Error) -> Self {
        StageError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<reqwest::Error> for StageError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();

        match err.status() {
            Some(status) if status.as_u16() == 404 => StageError::NotFound { url },
            Some(status) if status.is_server_error() || status.as_u16() == 429 => {
                StageError::NetworkUnavailable {
                    url,
                    reason: format!("HTTP {}", status.as_u16()),
                }
            }
            Some(status) => StageError::DownloadFailed {
                url,
                status: status.as_u16(),
            },
            None => StageError::NetworkUnavailable {
                url,
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        let network = StageError::NetworkUnavailable {
            url: "https://repo/x.jar".into(),
            reason: "timed out".into(),
        };
        assert!(network.is_retryable());

        let integrity = StageError::IntegrityMismatch {
            url: "https://repo/x.jar".into(),
            algorithm: "SHA-1".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert_eq!(integrity.kind(), ErrorKind::IntegrityMismatch);
        assert!(!integrity.is_retryable());

        let status = StageError::DownloadFailed {
            url: "https://repo/x.jar".into(),
            status: 403,
        };
        assert_eq!(status.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn staging_errors_keep_their_kind() {
        let err = StageError::staging(
            "/read-only",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::StagingIo);
        assert!(err.to_string().contains("/read-only"));
    }
}
