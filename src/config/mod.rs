//! Configuration loading.
//!
//! Resolution order:
//! 1. Explicit `--config` path (must exist)
//! 2. `config.toml` in the platform config directory (optional)
//! 3. Built-in defaults
//!
//! `NUTRI_API_URL` overrides `api.base_url` after the file is read.

pub mod schema;

pub use schema::{
    ApiConfig, AuthStrategy, Config, StorageConfig, SurfaceConfig, SurfacesConfig,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "NUTRI_API_URL";

const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "nutri", "nutri-client")
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => {
                    tracing::debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_base_url_override(std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Default config file location (`<config_dir>/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Replace the base URL when an override is present and non-empty.
    pub fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.api.base_url = trimmed.to_string();
            }
        }
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url '{}' is not a valid URL", self.api.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            );
        }
        for (name, value) in [
            ("api.login_path", &self.api.login_path),
            ("api.refresh_path", &self.api.refresh_path),
            ("api.me_path", &self.api.me_path),
        ] {
            if value.trim().is_empty() {
                bail!("{name} cannot be empty");
            }
        }
        Ok(())
    }

    /// Directory holding persisted session tokens.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.storage.data_dir.as_deref() {
            let expanded = shellexpand::tilde(dir);
            return Ok(PathBuf::from(expanded.as_ref()));
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .context("could not determine a data directory; set storage.data_dir")
    }

    /// JSON schema of the config file, pretty-printed.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.refresh_path, "/api/auth/refresh");
        assert!(config.surfaces.nutritionist.strategy.is_none());
    }

    #[test]
    fn parses_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://api.example.com"

[surfaces.admin]
storage_key = "adm"
strategy = "refresh_once"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.me_path, "/api/me");
        assert_eq!(config.surfaces.admin.storage_key.as_deref(), Some("adm"));
        assert_eq!(
            config.surfaces.admin.strategy,
            Some(AuthStrategy::RefreshOnce)
        );
    }

    #[test]
    fn missing_explicit_file_errors() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn base_url_override_applies() {
        let mut config = Config::default();
        config.apply_base_url_override(Some("https://prod.example.com".into()));
        assert_eq!(config.api.base_url, "https://prod.example.com");
    }

    #[test]
    fn blank_override_is_ignored() {
        let mut config = Config::default();
        config.apply_base_url_override(Some("   ".into()));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        config.apply_base_url_override(None);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn validate_rejects_garbage_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_paths() {
        let mut config = Config::default();
        config.api.refresh_path = " ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.refresh_path"));
    }

    #[test]
    fn explicit_data_dir_wins() {
        let mut config = Config::default();
        config.storage.data_dir = Some("/var/lib/nutri".into());
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/var/lib/nutri"));
    }

    #[test]
    fn schema_mentions_sections() {
        let schema = Config::json_schema().unwrap();
        assert!(schema.contains("base_url"));
        assert!(schema.contains("refresh_once"));
    }
}
