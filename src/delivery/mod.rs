//! OTP delivery over SMS and voice.

pub mod sms;
pub mod voice;

pub use sms::SmsDeliverer;
pub use voice::{speech_markup, VoiceDeliverer, VoiceDelivery, VoiceSession, VoiceSessionState};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Successful,
    Failed,
}

/// Outcome of a deliverer, consumed by the response builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub provider_name: String,
    pub transaction_id: String,
}

impl DeliveryResult {
    pub fn successful(provider_name: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Successful,
            provider_name: provider_name.into(),
            transaction_id: transaction_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_upper_case() {
        assert_eq!(
            serde_json::to_value(DeliveryStatus::Successful).unwrap(),
            "SUCCESSFUL"
        );
        assert_eq!(serde_json::to_value(DeliveryStatus::Failed).unwrap(), "FAILED");
    }
}
