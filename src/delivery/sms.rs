//! SMS delivery.

use super::DeliveryResult;
use crate::hook::error::HookError;
use crate::telephony::{OutboundSms, TelephonyProvider};
use std::sync::Arc;
use tracing::{error, info};

/// Text body sent to the user.
pub fn sms_body(code: &str) -> String {
    format!("Your verification code is: {}", code)
}

/// Sends the OTP as a text message. Send failures are not retried; the
/// identity provider owns any resend flow.
#[derive(Clone)]
pub struct SmsDeliverer {
    provider: Arc<dyn TelephonyProvider>,
    provider_name: String,
    from_number: String,
}

impl SmsDeliverer {
    pub fn new(
        provider: Arc<dyn TelephonyProvider>,
        provider_name: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            from_number: from_number.into(),
        }
    }

    pub async fn deliver(&self, to: &str, code: &str) -> Result<DeliveryResult, HookError> {
        let sms = OutboundSms {
            from: self.from_number.clone(),
            to: to.to_string(),
            body: sms_body(code),
        };

        let message_id = self.provider.send_sms(&sms).await.map_err(|e| {
            error!(error = %e, "SMS send failed");
            HookError::DeliveryFailed(e.to_string())
        })?;

        info!(message_id = %message_id, "SMS accepted by provider");
        Ok(DeliveryResult::successful(&self.provider_name, message_id))
    }
}
