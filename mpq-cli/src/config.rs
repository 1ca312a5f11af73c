//! Configuration file support

use crate::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default output format ("text" or "json")
    pub default_output: Option<String>,

    /// Let table probes wrap around by default
    pub wrap_probes: Option<bool>,

    /// Default target directory for `extract`
    pub extract_dir: Option<PathBuf>,
}

impl Config {
    /// Output format named by the file, text when unset
    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.default_output.as_deref() {
            None | Some("text") => Ok(OutputFormat::Text),
            Some("json") => Ok(OutputFormat::Json),
            Some(other) => bail!("Unknown default_output in config: {}", other),
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mpq-cli").join("config.toml"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mpq-cli").join("config.toml"));
    }
    paths
}

/// Load configuration from file or defaults
///
/// An explicit path must exist; the default locations are optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_locations().into_iter().find(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    log::debug!("Loading configuration from {}", config_path.display());
    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Invalid config: {}", config_path.display()))
}

fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            "default_output = \"json\"\nwrap_probes = true\nextract_dir = \"out\"\n",
        )
        .unwrap();
        assert_eq!(config.output_format().unwrap(), OutputFormat::Json);
        assert_eq!(config.wrap_probes, Some(true));
        assert_eq!(config.extract_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.output_format().unwrap(), OutputFormat::Text);
        assert!(config.wrap_probes.is_none());
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(parse_config("compression = \"zlib\"").is_err());
        let config = parse_config("default_output = \"csv\"").unwrap();
        assert!(config.output_format().is_err());
    }
}
