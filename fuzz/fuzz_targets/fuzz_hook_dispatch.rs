#![no_main]

use libfuzzer_sys::fuzz_target;

use otp_relay::delivery::speech_markup;
use otp_relay::hook::{ChannelDispatcher, DeliveryChannel, TelephonyEvent};

// Arbitrary request bodies must never panic on the way to a delivery request,
// and any accepted code must render to balanced speech markup.
fuzz_target!(|data: &[u8]| {
    let event = TelephonyEvent::from_slice(data);
    let Ok(request) = ChannelDispatcher.dispatch(&event) else {
        return;
    };

    assert!(!request.phone_number().is_empty());
    assert!(!request.otp_code().is_empty());

    if request.channel() == DeliveryChannel::Call {
        let markup = speech_markup(request.otp_code());
        assert!(markup.starts_with("<speak>"));
        assert!(markup.ends_with("</speak>"));
        assert_eq!(markup.matches("<prosody").count(), 2);
    }
});
