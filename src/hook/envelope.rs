//! Response envelopes the identity provider parses.

use crate::delivery::{DeliveryResult, DeliveryStatus};
use serde::Serialize;

/// Command type the identity provider expects for telephony results.
pub const TELEPHONY_ACTION: &str = "com.okta.telephony.action";

/// Exactly one of a success or error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success(SuccessBody),
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessBody {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Vec<ActionValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionValue {
    pub status: DeliveryStatus,
    pub provider: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub error_summary: String,
    pub error_causes: Vec<ErrorCause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCause {
    pub error_summary: String,
    pub reason: String,
}

/// Builds envelopes from delivery outcomes.
pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn success(result: DeliveryResult) -> ResponseEnvelope {
        ResponseEnvelope::Success(SuccessBody {
            commands: vec![Command {
                kind: TELEPHONY_ACTION.to_string(),
                value: vec![ActionValue {
                    status: result.status,
                    provider: result.provider_name,
                    transaction_id: result.transaction_id,
                }],
            }],
        })
    }

    /// The message is used as the summary and as the single cause's reason.
    pub fn error(message: impl Into<String>) -> ResponseEnvelope {
        let message = message.into();
        ResponseEnvelope::Error(ErrorBody {
            error: ErrorDetail {
                error_summary: message.clone(),
                error_causes: vec![ErrorCause {
                    error_summary: message.clone(),
                    reason: message,
                }],
            },
        })
    }
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success(_))
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Serializing these plain structs cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let envelope = ResponseBuilder::success(DeliveryResult::successful("SignalWire", "SM123"));
        assert!(envelope.is_success());
        assert_eq!(
            envelope.to_value(),
            json!({
                "commands": [{
                    "type": "com.okta.telephony.action",
                    "value": [{
                        "status": "SUCCESSFUL",
                        "provider": "SignalWire",
                        "transactionId": "SM123"
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_error_shape() {
        let envelope = ResponseBuilder::error("Authentication failed");
        assert!(!envelope.is_success());
        assert_eq!(
            envelope.to_value(),
            json!({
                "error": {
                    "errorSummary": "Authentication failed",
                    "errorCauses": [{
                        "errorSummary": "Authentication failed",
                        "reason": "Authentication failed"
                    }]
                }
            })
        );
    }

    #[test]
    fn test_error_never_carries_commands() {
        let value = ResponseBuilder::error("nope").to_value();
        assert!(value.get("commands").is_none());
        let value =
            ResponseBuilder::success(DeliveryResult::successful("SignalWire", "CA1")).to_value();
        assert!(value.get("error").is_none());
    }
}
