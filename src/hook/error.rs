//! Hook failure taxonomy.
//!
//! Every variant's display text is what the identity provider shows as both
//! `errorSummary` and `reason`, so messages are written for end users.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Authentication failed")]
    Authentication,

    #[error("Missing phone number or OTP")]
    MissingParameter,

    #[error("Unsupported delivery channel. Must be 'sms' or 'call'.")]
    UnsupportedChannel(Option<String>),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Cannot send SMS to non-mobile number. Detected line type: {0}")]
    IneligibleLineType(String),

    #[error("SMS delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Call placement failed: {0}")]
    CallPlacement(String),
}

impl HookError {
    /// Stable identifier for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            HookError::Authentication => "authentication",
            HookError::MissingParameter => "missing_parameter",
            HookError::UnsupportedChannel(_) => "unsupported_channel",
            HookError::LookupFailed(_) => "lookup_failed",
            HookError::IneligibleLineType(_) => "ineligible_line_type",
            HookError::DeliveryFailed(_) => "delivery_failed",
            HookError::CallPlacement(_) => "call_placement",
        }
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
