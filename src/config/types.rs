//! Typed configuration structures
//!
//! Strongly-typed access to the hook's configuration with defaults for
//! everything that is not a credential.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookConfig {
    /// HTTP listener configuration
    pub server: ServerConfig,
    /// Inbound request authentication
    pub auth: AuthConfig,
    /// Telephony provider (SignalWire) configuration
    pub provider: ProviderConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

/// Shared-secret authentication for the identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Expected value of the `auth_secret` header
    pub secret: String,
}

/// SignalWire provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Name reported in success envelopes
    pub name: String,
    /// SignalWire project id
    pub project_id: String,
    /// SignalWire API token
    pub api_token: String,
    /// SignalWire space host, e.g. `example.signalwire.com`
    pub space: String,
    /// Relay websocket host
    pub relay_host: String,
    /// Sender phone number (E.164)
    pub from_number: String,
    /// TTS voice profile
    pub voice: String,
    /// Seconds to wait for the callee to answer
    pub dial_timeout_secs: u32,
    /// Upper bound on each outbound request; unset means no watchdog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Overrides `https://{space}` as the lookup base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_base_url: Option<String>,
    /// Overrides `wss://{relayHost}` as the relay websocket URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "SignalWire".to_string(),
            project_id: String::new(),
            api_token: String::new(),
            space: String::new(),
            relay_host: "relay.signalwire.com".to_string(),
            from_number: String::new(),
            voice: "polly.Ruth".to_string(),
            dial_timeout_secs: 30,
            timeout_secs: None,
            lookup_base_url: None,
            relay_url: None,
        }
    }
}

impl ProviderConfig {
    /// Base URL for the carrier lookup REST API.
    pub fn lookup_base_url(&self) -> String {
        match &self.lookup_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.space),
        }
    }

    /// Websocket URL for the relay session.
    pub fn relay_url(&self) -> String {
        match &self.relay_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("wss://{}", self.relay_host),
        }
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `otp_relay=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl HookConfig {
    /// Validate the configuration, returning every missing required value.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.auth.secret.is_empty() {
            problems.push("auth.secret (AUTH_SECRET) is required".to_string());
        }
        if self.provider.project_id.is_empty() {
            problems.push("provider.projectId (SIGNALWIRE_PROJECT_ID) is required".to_string());
        }
        if self.provider.api_token.is_empty() {
            problems.push("provider.apiToken (SIGNALWIRE_API_TOKEN) is required".to_string());
        }
        if self.provider.space.is_empty() && self.provider.lookup_base_url.is_none() {
            problems.push("provider.space (SIGNALWIRE_SPACE) is required".to_string());
        }
        if self.provider.from_number.is_empty() {
            problems.push("provider.fromNumber (SIGNALWIRE_FROM_NUMBER) is required".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
