//! Configuration loading
//!
//! Values are layered, later sources overriding earlier ones: built-in
//! defaults, the user config file (`<config dir>/hoist/hoist.toml`), the
//! project file `./hoist.toml`, an explicitly given file, and finally the
//! `HOIST_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use etcetera::{BaseStrategy, choose_base_strategy};
use log::debug;
use serde::{Deserialize, Serialize};

/// Name of the config file looked up in every directory
pub const CONFIG_FILE_NAME: &str = "hoist.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Prefix of every minted variable name
    pub variable_prefix: String,
    /// First value of the minting counter
    pub counter_start: u64,
    /// Extensions tried by the filesystem resolver, without the dot
    pub extensions: Vec<String>,
    /// Readable suffix of namespace object variables
    pub namespace_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variable_prefix: "_$_".to_owned(),
            counter_start: 1000,
            extensions: vec!["js".to_owned(), "mjs".to_owned(), "cjs".to_owned()],
            namespace_name: "all".to_owned(),
        }
    }
}

/// A config file where every field is optional, for layering
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialConfig {
    variable_prefix: Option<String>,
    counter_start: Option<u64>,
    extensions: Option<Vec<String>>,
    namespace_name: Option<String>,
}

impl Config {
    /// Load the layered configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        for path in Self::default_locations() {
            if path.is_file() {
                config.merge_file(&path)?;
            }
        }
        if let Some(path) = explicit {
            config.merge_file(path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// User config dir first, then the working directory
    fn default_locations() -> Vec<PathBuf> {
        let mut locations = Vec::new();
        if let Ok(strategy) = choose_base_strategy() {
            locations.push(strategy.config_dir().join("hoist").join(CONFIG_FILE_NAME));
        }
        locations.push(PathBuf::from(CONFIG_FILE_NAME));
        locations
    }

    /// Overlay the values present in a TOML file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let partial: PartialConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        self.merge(partial);
        Ok(())
    }

    fn merge(&mut self, partial: PartialConfig) {
        if let Some(prefix) = partial.variable_prefix {
            self.variable_prefix = prefix;
        }
        if let Some(start) = partial.counter_start {
            self.counter_start = start;
        }
        if let Some(extensions) = partial.extensions {
            self.extensions = extensions;
        }
        if let Some(name) = partial.namespace_name {
            self.namespace_name = name;
        }
    }

    /// Apply `HOIST_VARIABLE_PREFIX` and `HOIST_COUNTER_START`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(prefix) = lookup("HOIST_VARIABLE_PREFIX") {
            self.variable_prefix = prefix;
        }
        if let Some(start) = lookup("HOIST_COUNTER_START") {
            self.counter_start = start
                .parse()
                .map_err(|_| anyhow!("HOIST_COUNTER_START must be an integer, got {start:?}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "variable-prefix = \"$h\"\ncounter-start = 1\n")?;

        let mut config = Config::default();
        config.merge_file(&path)?;

        assert_eq!(config.variable_prefix, "$h");
        assert_eq!(config.counter_start, 1);
        assert_eq!(config.namespace_name, "all");
        assert_eq!(config.extensions, vec!["js", "mjs", "cjs"]);
        Ok(())
    }

    #[test]
    fn test_invalid_file_names_path() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("broken.toml");
        fs::write(&path, "no-such-key = 1\n")?;

        let err = Config::default().merge_file(&path).expect_err("unknown key");
        assert!(err.to_string().contains("broken.toml"));
        Ok(())
    }

    #[test]
    fn test_environment_wins() -> Result<()> {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "HOIST_VARIABLE_PREFIX" => Some("__".to_owned()),
            "HOIST_COUNTER_START" => Some("7".to_owned()),
            _ => None,
        })?;
        assert_eq!(config.variable_prefix, "__");
        assert_eq!(config.counter_start, 7);

        let err = config
            .apply_env(|key| (key == "HOIST_COUNTER_START").then(|| "x".to_owned()))
            .expect_err("not a number");
        assert!(err.to_string().contains("HOIST_COUNTER_START"));
        Ok(())
    }
}
