//! Configuration loading
//!
//! The hook reads an optional JSON5 file and then overlays environment
//! variables, so a deployment can be driven entirely from the environment.

pub mod types;

pub use types::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "OTP_RELAY_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidEnv { key: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Resolve the config file path: explicit argument, then
/// `OTP_RELAY_CONFIG_PATH`, then `<config dir>/otp-relay/config.json5`.
pub fn get_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("otp-relay").join("config.json5"))
}

/// Load configuration from disk (if present) and the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<HookConfig> {
    let mut config = match get_config_path(explicit) {
        // An explicitly named file must exist; the default location is optional.
        Some(path) if explicit.is_some() || path.exists() => load_config_file(&path)?,
        _ => HookConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Parse a JSON5 config file.
pub fn load_config_file(path: &Path) -> Result<HookConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str::<HookConfig>(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Overlay environment variables onto `config`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut HookConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("AUTH_SECRET") {
        config.auth.secret = v;
    }
    if let Some(v) = get("SIGNALWIRE_PROJECT_ID") {
        config.provider.project_id = v;
    }
    if let Some(v) = get("SIGNALWIRE_API_TOKEN") {
        config.provider.api_token = v;
    }
    if let Some(v) = get("SIGNALWIRE_SPACE") {
        config.provider.space = v;
    }
    if let Some(v) = get("SIGNALWIRE_FROM_NUMBER") {
        config.provider.from_number = v;
    }
    if let Some(v) = get("SIGNALWIRE_RELAY_HOST") {
        config.provider.relay_host = v;
    }
    if let Some(v) = get("SIGNALWIRE_RELAY_URL") {
        config.provider.relay_url = Some(v);
    }
    if let Some(v) = get("OTP_RELAY_BIND") {
        config.server.bind = v;
    }
    if let Some(v) = get("OTP_RELAY_PORT") {
        config.server.port = v.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidEnv {
                key: "OTP_RELAY_PORT",
                message: e.to_string(),
            }
        })?;
    }
    if let Some(v) = get("OTP_RELAY_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = get("OTP_RELAY_LOG_FORMAT") {
        config.logging.format = v.parse().map_err(|message| ConfigError::InvalidEnv {
            key: "OTP_RELAY_LOG_FORMAT",
            message,
        })?;
    }

    Ok(())
}
