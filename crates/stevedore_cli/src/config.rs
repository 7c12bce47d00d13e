//! Optional `stevedore.toml` settings.
//!
//! Command line flags and environment variables always win over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use stevedore_core::{DEFAULT_PARALLELISM, DEFAULT_SECRET_TIMEOUT};
use stevedore_vault::VaultConfig;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE: &str = "stevedore.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub vault_token: Option<String>,
    pub vault_mount: Option<String>,
    pub secret_timeout_secs: Option<u64>,
    pub parallelism: Option<usize>,
    pub templates_dir: Option<PathBuf>,
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings file")
    }

    /// Load an explicit file, or `stevedore.toml` if present, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn secret_timeout(&self) -> Duration {
        self.secret_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SECRET_TIMEOUT)
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism.unwrap_or(DEFAULT_PARALLELISM)
    }

    /// Vault client config; a token flag wins over the file.
    pub fn vault_config(&self, token: Option<String>) -> VaultConfig {
        let mut config = VaultConfig::default().timeout(self.secret_timeout().as_secs().max(1));
        if let Some(mount) = &self.vault_mount {
            config = config.mount(mount);
        }
        if let Some(token) = token.or_else(|| self.vault_token.clone()) {
            config = config.token(token);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::parse(
            r#"
vault_token = "s.file"
secret_timeout_secs = 3
parallelism = 8
templates_dir = "shared/templates"
"#,
        )
        .unwrap();

        assert_eq!(settings.parallelism(), 8);
        assert_eq!(settings.secret_timeout(), Duration::from_secs(3));
        assert_eq!(settings.templates_dir, Some(PathBuf::from("shared/templates")));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.parallelism(), DEFAULT_PARALLELISM);
        assert_eq!(settings.secret_timeout(), DEFAULT_SECRET_TIMEOUT);
        assert!(settings.vault_config(None).token.is_none());
    }

    #[test]
    fn test_token_flag_wins() {
        let settings = Settings::parse("vault_token = \"s.file\"\nvault_mount = \"kv\"").unwrap();
        assert_eq!(settings.vault_config(None).token.as_deref(), Some("s.file"));

        let config = settings.vault_config(Some("s.flag".to_string()));
        assert_eq!(config.token.as_deref(), Some("s.flag"));
        assert_eq!(config.mount, "kv");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Settings::parse("paralelism = 2").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "parallelism = 2\n").unwrap();

        assert_eq!(Settings::load(Some(&path)).unwrap().parallelism(), 2);
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
