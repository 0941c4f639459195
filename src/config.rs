//! Configuration types for mirror access and downloads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dat::CatalogTable;
use crate::error::{Error, Result};

/// Root of the public Myrient file tree.
pub const DEFAULT_MIRROR_URL: &str = "https://myrient.erista.me/files/";

/// Size of each write while streaming a response body.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Which entry survives when two listing rows collapse to the same base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The row further down the listing replaces earlier ones.
    #[default]
    LastWins,
    /// The first row seen is kept.
    FirstWins,
}

/// Where and how to talk to the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Base URL that catalog links are relative to.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// `Accept` header sent with every request.
    pub accept: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MIRROR_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
        }
    }
}

impl MirrorConfig {
    /// Sets the mirror base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the base URL with exactly one trailing slash, ready for
    /// appending relative hrefs.
    #[must_use]
    pub fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

/// Configuration for download operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of bytes written per chunk.
    pub chunk_size: usize,
    /// Collision handling when building the remote index.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size. Zero is bumped to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the duplicate policy.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Mirror settings.
    pub mirror: MirrorConfig,
    /// Download settings.
    pub download: DownloadConfig,
    /// Extra authority URL to catalog label entries.
    pub catalogs: BTreeMap<String, String>,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of the per-user config file, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dat-dl").join("config.toml"))
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid for this schema.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read when present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => {
                    log::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Builds the authority table: built-in entries overlaid with the
    /// `[catalogs]` section.
    #[must_use]
    pub fn catalog_table(&self) -> CatalogTable {
        self.catalogs
            .iter()
            .fold(CatalogTable::default(), |table, (url, label)| {
                table.with_entry(url.clone(), label.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_download_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.chunk_size, 8192);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn download_config_builder_pattern() {
        let config = DownloadConfig::new()
            .with_chunk_size(0)
            .with_duplicate_policy(DuplicatePolicy::FirstWins);

        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
    }

    #[test]
    fn normalized_base_url_has_single_trailing_slash() {
        let mirror = MirrorConfig::default().with_base_url("http://127.0.0.1:9000");
        assert_eq!(mirror.normalized_base_url(), "http://127.0.0.1:9000/");

        let mirror = MirrorConfig::default().with_base_url("http://host/files//");
        assert_eq!(mirror.normalized_base_url(), "http://host/files/");

        assert_eq!(
            MirrorConfig::default().normalized_base_url(),
            DEFAULT_MIRROR_URL
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [download]
            duplicate_policy = "first-wins"

            [catalogs]
            "https://datomatic.no-intro.org" = "No-Intro"
            "#,
        )
        .unwrap();

        assert_eq!(config.download.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.download.duplicate_policy, DuplicatePolicy::FirstWins);
        assert_eq!(config.mirror, MirrorConfig::default());

        let table = config.catalog_table();
        assert_eq!(
            table.label_for("https://datomatic.no-intro.org"),
            Some("No-Intro")
        );
        assert_eq!(table.label_for("https://redump.org/"), Some("Redump"));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[download]\nchunk_size = \"big\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mirror]\nbase_url = \"http://localhost:8080/files/\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.mirror.base_url, "http://localhost:8080/files/");
        assert_eq!(config.mirror.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }
}
