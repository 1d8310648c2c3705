//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommands:
//! - `serve` (default) -- run the hook server
//! - `check-config` -- print the resolved configuration and validate it
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Okta telephony inline hook that delivers OTPs over SMS and voice.
#[derive(Parser, Debug)]
#[command(
    name = "otp-relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Okta telephony inline hook backed by SignalWire"
)]
pub struct Cli {
    /// Path to a JSON5 config file (default: OTP_RELAY_CONFIG_PATH or the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the hook server (default when no subcommand is given).
    Serve,

    /// Print the resolved configuration (secrets redacted) and validate it.
    CheckConfig,

    /// Print version, build date, and git commit information.
    Version,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config::HookConfig;
use serde_json::Value;

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["secret", "apitoken", "api_token", "token", "password"];

/// Run the `check-config` subcommand. Returns `false` if required settings are missing.
pub fn handle_check_config(config: &HookConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let redacted = redact_secrets(serde_json::to_value(config)?);
    println!("{}", serde_json::to_string_pretty(&redacted)?);

    match config.validate() {
        Ok(()) => {
            println!("Configuration OK");
            Ok(true)
        }
        Err(problems) => {
            for problem in &problems {
                eprintln!("  - {}", problem);
            }
            Ok(false)
        }
    }
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("otp-relay {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("OTP_RELAY_BUILD_DATE"));
    println!("  Git commit: {}", env!("OTP_RELAY_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

/// Redact known secret keys in a JSON value (recursive). Empty values are
/// left alone so a missing secret stays visible.
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    let empty = map
                        .get(&key)
                        .is_some_and(|v| v.as_str().is_some_and(str::is_empty));
                    if !empty {
                        map.insert(key, Value::String("[REDACTED]".to_string()));
                    }
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}
