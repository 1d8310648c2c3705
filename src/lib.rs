//! otp-relay library
//!
//! An Okta telephony inline hook that delivers one-time passcodes over SMS
//! and voice through SignalWire.

pub mod auth;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod hook;
pub mod logging;
pub mod lookup;
pub mod server;
pub mod telephony;
