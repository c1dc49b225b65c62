//! Configuration: YAML loading/saving, standard paths and the editor settings
//!
//! ```ignore
//! use lumen_core::config::{default_config_path, load_config, LumenConfig};
//!
//! let config: LumenConfig = load_config(&default_config_path("config.yaml"));
//! ```

mod io;
mod paths;
mod settings;

pub use io::{load_config, save_config, Validate};
pub use paths::{config_dir, default_config_path};
pub use settings::{
    FixtureConfig, LumenConfig, RefreshConfig, TimelineConfig, TransportConfig, WaveformConfig, ZoomConfig,
};
