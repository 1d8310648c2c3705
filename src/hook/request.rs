//! Inbound event model.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Outer shape of the telephony inline hook event. Only the fields the hook
/// reads are modelled; everything else in the event is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelephonyEvent {
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default)]
    pub message_profile: Option<MessageProfile>,
}

/// Fields are kept as raw JSON so one mistyped field cannot discard the
/// whole profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageProfile {
    #[serde(default)]
    pub phone_number: Option<Value>,
    #[serde(default)]
    pub otp_code: Option<Value>,
    #[serde(default)]
    pub delivery_channel: Option<Value>,
}

impl MessageProfile {
    /// Phone number as text. Numbers are accepted; other JSON types are not.
    pub fn phone_number(&self) -> Option<String> {
        self.phone_number.as_ref().and_then(scalar_text)
    }

    pub fn otp_code(&self) -> Option<String> {
        self.otp_code.as_ref().and_then(scalar_text)
    }

    /// The channel if it was sent as a string.
    pub fn delivery_channel(&self) -> Option<&str> {
        self.delivery_channel.as_ref().and_then(Value::as_str)
    }

    /// The channel as received, for error reporting: strings verbatim,
    /// anything else as its JSON text.
    pub fn raw_delivery_channel(&self) -> Option<String> {
        self.delivery_channel.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TelephonyEvent {
    /// Parse an event body. Bodies that are not JSON objects yield an empty
    /// event, which dispatch then rejects as missing parameters.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn message_profile(&self) -> Option<&MessageProfile> {
        self.data.as_ref()?.message_profile.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    Sms,
    Call,
}

impl DeliveryChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryChannel::Sms => "sms",
            DeliveryChannel::Call => "call",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated delivery request. Constructed only by the dispatcher, so the
/// phone number and code are always non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    phone_number: String,
    otp_code: String,
    channel: DeliveryChannel,
}

impl DeliveryRequest {
    pub(crate) fn new(phone_number: String, otp_code: String, channel: DeliveryChannel) -> Self {
        Self {
            phone_number,
            otp_code,
            channel,
        }
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn otp_code(&self) -> &str {
        &self.otp_code
    }

    pub fn channel(&self) -> DeliveryChannel {
        self.channel
    }
}

// The OTP never appears in Debug output.
impl fmt::Debug for DeliveryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryRequest")
            .field("phone_number", &crate::logging::mask_phone(&self.phone_number))
            .field("otp_code", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event() {
        let body = br#"{
            "eventType": "com.okta.telephony.provider",
            "data": {
                "messageProfile": {
                    "msgTemplate": "Your code is 123456",
                    "phoneNumber": "+15551234567",
                    "otpExpires": "2026-01-01T00:00:00.000Z",
                    "deliveryChannel": "SMS",
                    "otpCode": "123456",
                    "locale": "EN-US"
                }
            }
        }"#;
        let event = TelephonyEvent::from_slice(body);
        let profile = event.message_profile().unwrap();
        assert_eq!(profile.phone_number().as_deref(), Some("+15551234567"));
        assert_eq!(profile.otp_code().as_deref(), Some("123456"));
        assert_eq!(profile.delivery_channel(), Some("SMS"));
    }

    #[test]
    fn test_mistyped_fields_keep_profile() {
        let body = br#"{"data":{"messageProfile":{
            "phoneNumber": "+15551234567",
            "otpCode": 123456,
            "deliveryChannel": ["sms"]
        }}}"#;
        let event = TelephonyEvent::from_slice(body);
        let profile = event.message_profile().unwrap();
        assert_eq!(profile.phone_number().as_deref(), Some("+15551234567"));
        assert_eq!(profile.otp_code().as_deref(), Some("123456"));
        assert_eq!(profile.delivery_channel(), None);
        assert_eq!(profile.raw_delivery_channel().as_deref(), Some(r#"["sms"]"#));
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        assert!(TelephonyEvent::from_slice(b"not json").message_profile().is_none());
        assert!(TelephonyEvent::from_slice(b"[1,2]").message_profile().is_none());
        assert!(TelephonyEvent::from_slice(br#"{"data":{}}"#)
            .message_profile()
            .is_none());
    }

    #[test]
    fn test_debug_redacts_code() {
        let req = DeliveryRequest::new(
            "+15551234567".to_string(),
            "987654".to_string(),
            DeliveryChannel::Sms,
        );
        let debug = format!("{:?}", req);
        assert!(!debug.contains("987654"));
        assert!(!debug.contains("+1555123"));
        assert!(debug.contains("4567"));
    }
}
