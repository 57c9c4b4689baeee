mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

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
        "./streamgate.toml",
        "~/.config/streamgate/config.toml",
        "/etc/streamgate/config.toml",
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

/// Apply the environment overrides understood by earlier deployments.
///
/// `STREAM_DIR`, `CLEANUP_DELAY_SECONDS`, `HLS_SEGMENT_TIME`, `HLS_LIST_SIZE`
/// and `PORT`. Values that fail to parse are logged and ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(dir) = env_var("STREAM_DIR") {
        config.streams.dir = PathBuf::from(dir);
    }
    if let Some(secs) = env_parse("CLEANUP_DELAY_SECONDS") {
        config.streams.idle_timeout_secs = secs;
    }
    if let Some(secs) = env_parse("HLS_SEGMENT_TIME") {
        config.hls.segment_time = secs;
    }
    if let Some(size) = env_parse("HLS_LIST_SIZE") {
        config.hls.list_size = size;
    }
    if let Some(port) = env_parse("PORT") {
        config.server.port = port;
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', keeping configured value", key, raw);
            None
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.hls.segment_time == 0 {
        anyhow::bail!("hls.segment_time must be at least 1 second");
    }

    if config.hls.list_size == 0 {
        anyhow::bail!("hls.list_size must be at least 1");
    }

    if config.streams.sweep_interval_secs == 0 {
        anyhow::bail!("streams.sweep_interval_secs must be at least 1 second");
    }

    if !config.streams.public_path.starts_with('/') {
        anyhow::bail!(
            "streams.public_path must start with '/': {:?}",
            config.streams.public_path
        );
    }

    if config.hls.playlist_name.is_empty() || config.hls.playlist_name.contains('/') {
        anyhow::bail!(
            "hls.playlist_name must be a plain file name: {:?}",
            config.hls.playlist_name
        );
    }

    if config.streams.idle_timeout_secs < config.hls.segment_time as u64 {
        tracing::warn!(
            "streams.idle_timeout_secs ({}) is shorter than one HLS segment ({}s); \
             streams may be swept before a client can fetch anything",
            config.streams.idle_timeout_secs,
            config.hls.segment_time
        );
    }

    Ok(())
}
