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

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./discprobe.toml",
        "~/.config/discprobe/config.toml",
        "/etc/discprobe/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.limits.candidate_limit == 0 {
        anyhow::bail!("limits.candidate_limit must be at least 1");
    }

    if config.limits.request_timeout_secs == 0 {
        anyhow::bail!("limits.request_timeout_secs must be at least 1");
    }

    if config.media.max_suggestions == 0 {
        anyhow::bail!("media.max_suggestions must be at least 1");
    }

    if !config.media.root.exists() {
        tracing::warn!("Media root does not exist: {:?}", config.media.root);
    }

    if let Some(dir) = &config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static dir does not exist: {:?}", dir);
        }
    }

    Ok(())
}
