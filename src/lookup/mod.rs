//! Phone-number line type lookup and SMS eligibility.

pub mod rest;

pub use rest::SignalWireLookup;

use crate::hook::error::HookError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Carrier classification of a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineType {
    Mobile,
    Landline,
    Voip,
    /// A classification this hook has no rule for, kept verbatim.
    Other(String),
    Unknown,
}

impl LineType {
    /// Classify a raw carrier `linetype` value.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return LineType::Unknown;
        };
        match raw.to_ascii_lowercase().as_str() {
            "wireless" | "mobile" => LineType::Mobile,
            "landline" => LineType::Landline,
            "voip" => LineType::Voip,
            other => LineType::Other(other.to_string()),
        }
    }

    /// Lines that can receive SMS.
    pub fn accepts_sms(&self) -> bool {
        matches!(self, LineType::Mobile | LineType::Voip)
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineType::Mobile => f.write_str("mobile"),
            LineType::Landline => f.write_str("landline"),
            LineType::Voip => f.write_str("voip"),
            LineType::Other(raw) => f.write_str(raw),
            LineType::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTypeInfo {
    pub line_type: LineType,
}

/// Carrier information lookup port.
#[async_trait]
pub trait LineTypeLookup: Send + Sync {
    async fn lookup(&self, phone_number: &str) -> Result<LineTypeInfo, LookupError>;
}

/// Gates SMS delivery on the number's line type.
#[derive(Clone)]
pub struct EligibilityChecker {
    lookup: Arc<dyn LineTypeLookup>,
}

impl EligibilityChecker {
    pub fn new(lookup: Arc<dyn LineTypeLookup>) -> Self {
        Self { lookup }
    }

    /// Lookup failures are not retried.
    pub async fn check_sms(&self, phone_number: &str) -> Result<LineTypeInfo, HookError> {
        let info = self.lookup.lookup(phone_number).await.map_err(|e| {
            warn!(error = %e, "line type lookup failed");
            HookError::LookupFailed(e.to_string())
        })?;

        if !info.line_type.accepts_sms() {
            info!(line_type = %info.line_type, "number not eligible for SMS");
            return Err(HookError::IneligibleLineType(info.line_type.to_string()));
        }
        Ok(info)
    }
}
