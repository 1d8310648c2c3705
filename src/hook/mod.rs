//! Telephony inline hook core
//!
//! Turns one identity-provider invocation into exactly one response
//! envelope: authenticate, dispatch on channel, deliver, respond.

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod request;

pub use dispatch::ChannelDispatcher;
pub use envelope::{ResponseBuilder, ResponseEnvelope};
pub use error::HookError;
pub use handler::TelephonyHook;
pub use request::{DeliveryChannel, DeliveryRequest, TelephonyEvent};
