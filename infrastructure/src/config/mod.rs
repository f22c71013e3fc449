//! Configuration file loading for moegate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `MOEGATE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./moegate.toml` or `./.moegate.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/moegate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileClassifierConfig, FileConfig, FileExpertConfig, FileGateConfig, FileModelConfig,
    FileTokenizerConfig, parse_experts,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
