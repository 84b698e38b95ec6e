//! Configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "OASIS_CONFIG";

/// Where a configuration file path came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line; must exist
    CommandLine(PathBuf),
    /// Named by environment variable; must exist
    Environment(PathBuf),
    /// Found in a platform config directory
    Platform(PathBuf),
    /// Nothing found; built-in defaults apply
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::Platform(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }

    /// Explicitly named files are required to exist and parse
    fn is_explicit(&self) -> bool {
        matches!(self, ConfigSource::CommandLine(_) | ConfigSource::Environment(_))
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. User config directory (`~/.config/oasis/config.toml` on Linux)
/// 4. System config (`/etc/oasis/config.toml`, unix only)
/// 5. Built-in defaults
pub fn resolve_config_source(cli_arg: Option<&Path>, env_var_name: &str) -> ConfigSource {
    if let Some(path) = cli_arg {
        return ConfigSource::CommandLine(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(env_var_name).filter(|v| !v.is_empty()) {
        return ConfigSource::Environment(PathBuf::from(path));
    }

    platform_config_candidates()
        .into_iter()
        .find(|p| p.exists())
        .map(ConfigSource::Platform)
        .unwrap_or(ConfigSource::Defaults)
}

fn platform_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("oasis").join("config.toml"));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc/oasis/config.toml"));
    }
    candidates
}

/// Load a TOML configuration from the resolved source.
///
/// Missing platform files fall back to `T::default()`. Explicitly named
/// files that are missing or malformed are errors.
pub fn load_toml<T>(source: &ConfigSource) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = source.path() else {
        debug!("No configuration file found, using built-in defaults");
        return Ok(T::default());
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !source.is_explicit() => {
            debug!("Config file {} disappeared, using defaults", path.display());
            return Ok(T::default());
        }
        Err(e) => {
            return Err(Error::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        level: String,
    }

    #[test]
    #[serial]
    fn test_cli_arg_wins_over_env() {
        std::env::set_var("OASIS_TEST_CONFIG", "/from/env.toml");
        let source = resolve_config_source(Some(Path::new("/from/cli.toml")), "OASIS_TEST_CONFIG");
        assert_eq!(source, ConfigSource::CommandLine(PathBuf::from("/from/cli.toml")));
        std::env::remove_var("OASIS_TEST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_env_used_without_cli_arg() {
        std::env::set_var("OASIS_TEST_CONFIG", "/from/env.toml");
        let source = resolve_config_source(None, "OASIS_TEST_CONFIG");
        assert_eq!(source, ConfigSource::Environment(PathBuf::from("/from/env.toml")));
        std::env::remove_var("OASIS_TEST_CONFIG");
    }

    #[test]
    fn test_defaults_without_file() {
        let config: Sample = load_toml(&ConfigSource::Defaults).unwrap();
        assert_eq!(config, Sample::default());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let source = ConfigSource::CommandLine(PathBuf::from("/nonexistent/oasis.toml"));
        let result: Result<Sample> = load_toml(&source);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_and_malformed() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "level = \"debug\"").unwrap();
        let source = ConfigSource::CommandLine(good.path().to_path_buf());
        let config: Sample = load_toml(&source).unwrap();
        assert_eq!(config.level, "debug");

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "level = [").unwrap();
        let result: Result<Sample> = load_toml(&ConfigSource::Platform(bad.path().to_path_buf()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
