//! Configuration file for kscope

use anyhow::{Context, Result};
use clap::ValueEnum;
use kafkascope_kafka::DissectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoder limits and checksum verification
    pub decoder: DissectorConfig,

    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormat,

    /// Enable colored output
    pub colored: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            colored: true,
        }
    }
}

impl Config {
    /// Load `path`, or the default location when no path is given.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Get config file path (~/.kafkascope/config.toml)
    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".kafkascope").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.colored);
        assert!(config.decoder.verify_checksums);
        assert_eq!(config.decoder.max_nesting_depth, 8);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml_str = r#"
            [output]
            format = "json"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.colored);
        assert_eq!(config.decoder.max_nesting_depth, 8);
    }

    #[test]
    fn test_decoder_section() {
        let toml_str = r#"
            [decoder]
            verify_checksums = false
            max_frame_size = 1024
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.decoder.verify_checksums);
        assert_eq!(config.decoder.max_frame_size, 1024);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let toml_str = r#"
            [output]
            format = "yaml"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.output.colored = false;
        config.decoder.max_nesting_depth = 2;
        std::fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert!(!loaded.output.colored);
        assert_eq!(loaded.decoder.max_nesting_depth, 2);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }
}
