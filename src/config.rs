//! Configuration types for the synchronizer and the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::normalize_origin;

/// Names of the three caches a synchronizer owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNames {
    /// Cache serving requests.
    pub live: String,
    /// Cache filled during install and promoted on activation.
    pub staging: String,
    /// Single-entry cache holding the last applied manifest.
    pub snapshot: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            live: "asset-cache".to_string(),
            staging: "asset-temp-cache".to_string(),
            snapshot: "asset-manifest".to_string(),
        }
    }
}

impl CacheNames {
    /// Checks that every name is usable as a cache and that the three
    /// caches are distinct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty name, `.` or `..`, or
    /// two roles sharing one cache.
    pub fn validate(&self) -> Result<()> {
        let roles = [
            ("live", &self.live),
            ("staging", &self.staging),
            ("snapshot", &self.snapshot),
        ];
        for (role, name) in roles {
            check_cache_name(name)
                .map_err(|reason| Error::InvalidConfig(format!("{role} cache {reason}")))?;
        }
        for (i, (role, name)) in roles.iter().enumerate() {
            if let Some((other, _)) = roles[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(Error::InvalidConfig(format!(
                    "{role} and {other} caches share the name {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Rejects names that do not denote a single cache of their own.
pub(crate) fn check_cache_name(name: &str) -> std::result::Result<(), String> {
    match name.trim() {
        "" => Err("name is empty".to_string()),
        "." | ".." => Err(format!("name {name:?} is reserved")),
        _ => Ok(()),
    }
}

/// Configuration for a synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Origin all resource keys are relative to, e.g. `https://app.example`.
    pub origin: String,
    /// Cache names.
    pub caches: CacheNames,
    /// Number of concurrent requests in a batch fetch.
    pub concurrent_fetches: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            caches: CacheNames::default(),
            concurrent_fetches: 4,
        }
    }
}

impl SyncConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the origin. A trailing slash is dropped.
    #[must_use]
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = normalize_origin(origin);
        self
    }

    /// Sets the cache names. They are validated when a synchronizer is
    /// built from this configuration.
    #[must_use]
    pub fn with_caches(mut self, caches: CacheNames) -> Self {
        self.caches = caches;
        self
    }

    /// Sets the number of concurrent batch requests (at least one).
    #[must_use]
    pub fn with_concurrent_fetches(mut self, concurrent: usize) -> Self {
        self.concurrent_fetches = concurrent.max(1);
        self
    }
}

/// Path configuration for the store and config directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding the durable caches.
    pub store_dir: PathBuf,
    /// Directory where the configuration file is read from.
    pub config_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            store_dir: Self::default_store_dir(),
            config_dir: config_dir.join("asset-sync"),
        }
    }
}

impl PathConfig {
    /// Uses `STATE_DIRECTORY` (set by systemd when `StateDirectory=` is
    /// configured), falling back to `$XDG_DATA_HOME/asset-sync`.
    #[must_use]
    pub fn default_store_dir() -> PathBuf {
        std::env::var("STATE_DIRECTORY").map_or_else(
            |_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("asset-sync")
                    .join("stores")
            },
            |dir| PathBuf::from(dir).join("stores"),
        )
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub paths: PathConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML configuration document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this schema
    /// or names unusable caches.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.sync.origin = normalize_origin(&config.sync.origin);
        config.sync.concurrent_fetches = config.sync.concurrent_fetches.max(1);
        config.sync.caches.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, or from the default config file.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathConfig::default().config_file(), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                log::info!("Loaded config from {}", path.display());
                Self::parse(&contents)
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sync_config() {
        let config = SyncConfig::default();
        assert_eq!(config.origin, "http://localhost");
        assert_eq!(config.caches.live, "asset-cache");
        assert_eq!(config.caches.staging, "asset-temp-cache");
        assert_eq!(config.caches.snapshot, "asset-manifest");
        assert_eq!(config.concurrent_fetches, 4);
    }

    #[test]
    fn sync_config_builder_pattern() {
        let config = SyncConfig::new()
            .with_origin("https://app.test/")
            .with_concurrent_fetches(0)
            .with_caches(CacheNames {
                live: "l".into(),
                staging: "s".into(),
                snapshot: "m".into(),
            });

        assert_eq!(config.origin, "https://app.test");
        assert_eq!(config.concurrent_fetches, 1);
        assert_eq!(config.caches.staging, "s");
    }

    #[test]
    fn parse_partial_toml() {
        let config = AppConfig::parse(
            r#"
            [sync]
            origin = "https://app.test/"

            [sync.caches]
            live = "v2-cache"

            [paths]
            store_dir = "/tmp/stores"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.origin, "https://app.test");
        assert_eq!(config.sync.caches.live, "v2-cache");
        assert_eq!(config.sync.caches.staging, "asset-temp-cache");
        assert_eq!(config.sync.concurrent_fetches, 4);
        assert_eq!(config.paths.store_dir, PathBuf::from("/tmp/stores"));
    }

    #[test]
    fn parse_rejects_wrong_types() {
        assert!(AppConfig::parse("[sync]\nconcurrent_fetches = \"many\"").is_err());
    }

    #[test]
    fn default_cache_names_are_valid() {
        assert!(CacheNames::default().validate().is_ok());
    }

    #[test]
    fn cache_names_reject_empty_and_dot_names() {
        for bad in ["", "  ", ".", ".."] {
            let names = CacheNames {
                staging: bad.to_string(),
                ..CacheNames::default()
            };
            assert!(
                matches!(names.validate(), Err(Error::InvalidConfig(ref msg)) if msg.starts_with("staging")),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn cache_names_must_be_distinct() {
        let names = CacheNames {
            live: "shared".into(),
            staging: "shared".into(),
            snapshot: "m".into(),
        };
        let err = names.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: live and staging caches share the name \"shared\""
        );

        let names = CacheNames {
            snapshot: "asset-cache".into(),
            ..CacheNames::default()
        };
        assert!(names.validate().is_err());
    }

    #[test]
    fn parse_rejects_unusable_cache_names() {
        let err = AppConfig::parse("[sync.caches]\nstaging = \"\"\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(AppConfig::parse("[sync.caches]\nlive = \"..\"\n").is_err());
        assert!(
            AppConfig::parse("[sync.caches]\nlive = \"x\"\nsnapshot = \"x\"\n").is_err()
        );
    }

    #[test]
    fn load_explicit_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\nconcurrent_fetches = 9\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sync.concurrent_fetches, 9);
    }

    #[test]
    fn default_path_config() {
        let config = PathConfig::default();
        assert!(config.config_dir.to_string_lossy().contains("asset-sync"));
        assert!(config.config_file().ends_with("config.toml"));
        assert!(config.store_dir.ends_with("stores"));
    }
}
