//! Channel dispatch: turns an inbound event into a validated request.

use super::error::{HookError, Result};
use super::request::{DeliveryChannel, DeliveryRequest, TelephonyEvent};

/// Selects the delivery channel for an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelDispatcher;

impl ChannelDispatcher {
    /// Validate parameters first, then the channel.
    pub fn dispatch(&self, event: &TelephonyEvent) -> Result<DeliveryRequest> {
        let profile = event.message_profile();

        let phone_number = profile
            .and_then(|p| non_empty(p.phone_number()))
            .ok_or(HookError::MissingParameter)?;
        let otp_code = profile
            .and_then(|p| non_empty(p.otp_code()))
            .ok_or(HookError::MissingParameter)?;

        let channel = parse_channel(profile.and_then(|p| p.delivery_channel())).ok_or_else(|| {
            HookError::UnsupportedChannel(profile.and_then(|p| p.raw_delivery_channel()))
        })?;

        Ok(DeliveryRequest::new(phone_number, otp_code, channel))
    }
}

/// Case-insensitive match against `sms` / `call`.
pub fn parse_channel(raw: Option<&str>) -> Option<DeliveryChannel> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "sms" => Some(DeliveryChannel::Sms),
        "call" => Some(DeliveryChannel::Call),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
