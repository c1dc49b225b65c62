//! YAML configuration loading and saving

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Configuration types that correct out-of-range values after loading
pub trait Validate {
    /// Clamp every field into its supported range
    fn validate(&mut self);
}

/// Load and validate configuration from a YAML file
///
/// A missing file yields defaults. An unreadable or unparsable file is logged and
/// also yields defaults: a broken config never keeps the editor from starting.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default + Validate,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: No config at {:?}, using defaults", path);
        return T::default();
    }

    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                return T::default();
            }
        },
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}, using defaults", e);
            return T::default();
        }
    };

    config.validate();
    log::info!("load_config: Loaded config from {:?}", path);
    config
}

/// Save configuration as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Cadence {
        interval_ms: u64,
        label: String,
    }

    impl Default for Cadence {
        fn default() -> Self {
            Self {
                interval_ms: 16,
                label: "playhead".to_string(),
            }
        }
    }

    impl Validate for Cadence {
        fn validate(&mut self) {
            self.interval_ms = self.interval_ms.clamp(1, 1000);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config: Cadence = load_config(Path::new("/nonexistent/lumen/config.yaml"));
        assert_eq!(config, Cadence::default());
    }

    #[test]
    fn test_roundtrip_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = Cadence {
            interval_ms: 33,
            label: "slow".to_string(),
        };

        save_config(&config, &path).unwrap();
        let loaded: Cadence = load_config(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_loaded_values_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "interval_ms: 0\n").unwrap();

        let loaded: Cadence = load_config(&path);

        assert_eq!(loaded.interval_ms, 1);
        assert_eq!(loaded.label, "playhead");
    }

    #[test]
    fn test_invalid_yaml_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "interval_ms: [not a number\n").unwrap();

        let loaded: Cadence = load_config(&path);

        assert_eq!(loaded, Cadence::default());
    }
}
