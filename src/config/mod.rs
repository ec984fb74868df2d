mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./mkvsource.toml",
        "~/.config/mkvsource/config.toml",
        "/etc/mkvsource/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let demux = &config.demux;

    if demux.read_size == 0 {
        anyhow::bail!("demux.read_size cannot be 0");
    }
    if demux.max_read_size < demux.read_size {
        anyhow::bail!(
            "demux.max_read_size ({}) cannot be smaller than demux.read_size ({})",
            demux.max_read_size,
            demux.read_size
        );
    }
    if demux.initial_buffer_size == 0 {
        anyhow::bail!("demux.initial_buffer_size cannot be 0");
    }
    if demux.sample_queue == 0 {
        anyhow::bail!("demux.sample_queue cannot be 0");
    }
    // The stored lace count is one byte.
    if demux.frame_ring_capacity == 0 || demux.frame_ring_capacity > 256 {
        anyhow::bail!(
            "demux.frame_ring_capacity must be between 1 and 256, got {}",
            demux.frame_ring_capacity
        );
    }
    if demux.max_element_size < 1024 {
        anyhow::bail!("demux.max_element_size must be at least 1024 bytes");
    }
    if demux.max_frame_size == 0 {
        anyhow::bail!("demux.max_frame_size cannot be 0");
    }

    Ok(())
}
