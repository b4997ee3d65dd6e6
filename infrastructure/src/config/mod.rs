//! Configuration file loading for duet
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `DUET_`-prefixed environment variables (`DUET_GENERATOR__MODEL=...`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./duet.toml` or `./.duet.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/duet/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentsConfig, FileConfig, FileDiscussionConfig,
    FileGeneratorConfig, FileLoggingConfig, FileNarratorConfig, NarratorBackend,
};
pub use loader::ConfigLoader;
