use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{StageError, StageResult};
use crate::core::maven::MAVEN_CENTRAL;
use crate::core::pipeline::RetryPolicy;
use crate::core::staging::LinkMode;

const APP_DIR_NAME: &str = "nativestage";
pub const SETTINGS_FILE: &str = "nativestage.json";

/// Tool configuration, read from `nativestage.json`. Every field has a
/// default so partial files are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagerSettings {
    pub cache_dir: PathBuf,
    pub staging_dir: PathBuf,
    /// Used when a manifest names no repositories.
    pub repositories: Vec<String>,
    /// Maximum parallel fetches.
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    pub link_mode: LinkMode,
    pub extract_natives: bool,
}

impl Default for StagerSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            staging_dir: PathBuf::from("build").join("natives"),
            repositories: vec![MAVEN_CENTRAL.to_string()],
            concurrency: 8,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
            link_mode: LinkMode::Copy,
            extract_natives: false,
        }
    }
}

impl StagerSettings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> StageResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => return Err(StageError::io(path, source)),
        };

        let settings: StagerSettings = serde_json::from_str(&raw)
            .map_err(|e| StageError::Config(format!("{}: {e}", path.display())))?;
        settings.validate()?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> StageResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| StageError::io(path, source))
    }

    pub fn validate(&self) -> StageResult<()> {
        if self.concurrency == 0 {
            return Err(StageError::Config("concurrency must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(StageError::Config("timeout_secs must be at least 1".into()));
        }
        if self.repositories.iter().any(|r| r.trim().is_empty()) {
            return Err(StageError::Config("repository URLs must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StagerSettings::load(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, StagerSettings::default());
        assert_eq!(settings.repositories, vec![MAVEN_CENTRAL.to_string()]);
        assert!(settings.cache_dir.ends_with(APP_DIR_NAME));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"{ "concurrency": 2, "link_mode": "hardlink", "retry": { "max_attempts": 6 } }"#,
        )
        .unwrap();

        let settings = StagerSettings::load(&path).unwrap();
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.link_mode, LinkMode::Hardlink);
        assert_eq!(settings.retry.max_attempts, 6);
        assert_eq!(settings.retry.base_delay_ms, RetryPolicy::default().base_delay_ms);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = StagerSettings {
            extract_natives: true,
            staging_dir: dir.path().join("out"),
            ..StagerSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(StagerSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "concurrency": 0 }"#).unwrap();
        assert!(matches!(
            StagerSettings::load(&path),
            Err(StageError::Config(_))
        ));
    }
}
