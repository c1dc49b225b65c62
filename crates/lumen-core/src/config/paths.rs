//! Standard configuration locations

use std::path::PathBuf;

/// Configuration directory: `~/.config/lumen`
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("lumen")
}

/// `~/.config/lumen/{filename}`
pub fn default_config_path(filename: &str) -> PathBuf {
    config_dir().join(filename)
}
