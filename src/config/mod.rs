mod types;

pub use types::*;

use anyhow::{Context, Result};
use reelgate_common::Error;
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
        "./reelgate.toml",
        "~/.config/reelgate/config.toml",
        "/etc/reelgate/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let config = Config::default();
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> reelgate_common::Result<()> {
    if config.server.port == 0 {
        return Err(Error::config("Server port cannot be 0"));
    }

    let chunk = config.stream.chunk_size;
    if chunk == 0 || chunk % 4096 != 0 || MAX_CHUNK_SIZE % chunk != 0 {
        return Err(Error::config(format!(
            "stream.chunk_size {chunk} must be a multiple of 4096 dividing {MAX_CHUNK_SIZE}"
        )));
    }

    if config.stream.chunk_timeout_secs == 0 {
        return Err(Error::config("stream.chunk_timeout_secs cannot be 0"));
    }

    if !(1..=4).contains(&config.stream.prefetch_chunks) {
        return Err(Error::config(format!(
            "stream.prefetch_chunks {} must be between 1 and 4",
            config.stream.prefetch_chunks
        )));
    }

    if config.telegram.tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::config("telegram.tokens contains an empty token"));
    }

    if !config.telegram.tokens.is_empty() && config.telegram.bin_chat_id == 0 {
        return Err(Error::config(
            "telegram.bin_chat_id is required when tokens are configured",
        ));
    }

    if config.telegram.tokens.is_empty() {
        tracing::warn!("No telegram tokens configured; every stream will fail with 503");
    }

    if let Some(path) = &config.catalog.path {
        if !path.exists() {
            tracing::warn!("Catalog file does not exist: {:?}", path);
        }
    }

    Ok(())
}
