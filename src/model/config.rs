use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::catalog::{Catalog, ProviderEntry};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub command: CommandConfig,
    pub ui: UiConfig,
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CommandConfig {
    /// Installer invocation, e.g. `pip install`.
    pub base: String,
    /// Package the extras belong to.
    pub package: String,
}

#[derive(Debug, Deserialize)]
pub struct UiConfig {
    pub tick_ms: u64,
    pub notification_secs: u64,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let defaults = include_str!("../../config/default.toml");
        let mut config: AppConfig =
            toml::from_str(defaults).context("embedded default config is invalid")?;

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                config = Self::load_from(&path)?;
            }
        }

        Ok(config)
    }

    /// Load configuration from an explicit file, replacing the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config at {}", path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("cannot parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ecoinstall")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// The command prefix the extras suffix attaches to.
    pub fn base_command(&self) -> String {
        format!("{} {}", self.command.base, self.command.package)
    }

    /// Validate the provider list into a catalog.
    pub fn catalog(&self) -> Result<Catalog> {
        let catalog = Catalog::from_entries(self.providers.clone())
            .context("invalid provider catalog in config")?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let defaults = include_str!("../../config/default.toml");
        let config: AppConfig = toml::from_str(defaults).unwrap();
        assert_eq!(config.base_command(), "pip install ecologits");

        let catalog = config.catalog().unwrap();
        let toggles = catalog.toggles();
        assert_eq!(toggles[0].value, "openai");
        assert_eq!(toggles[1].value, "anthropic");
        assert_eq!(toggles[2].value, "mistralai");
        // Nothing pre-checked out of the box.
        assert!(toggles.iter().all(|t| !t.checked));
    }

    #[test]
    fn user_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[command]
base = "uv pip install"
package = "ecologits"

[ui]
tick_ms = 100
notification_secs = 5

[[providers]]
value = "openai"
checked = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.base_command(), "uv pip install ecologits");
        assert_eq!(config.ui.tick_ms, 100);

        let toggles = config.catalog().unwrap().toggles();
        assert_eq!(toggles.len(), 1);
        assert!(toggles[0].checked);
    }

    #[test]
    fn malformed_user_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [").unwrap();
        assert!(AppConfig::load_from(file.path()).is_err());
    }
}
