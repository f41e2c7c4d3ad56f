//! Subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use nfex_core::NfexConfig;

/// Load and validate the configuration given by `--config`, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<NfexConfig> {
    let config = match config_path {
        Some(path) => {
            debug!("Loading configuration from {}", path);
            NfexConfig::from_file(Path::new(path))
                .with_context(|| format!("Failed to load configuration from {}", path))?
        }
        None => NfexConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
