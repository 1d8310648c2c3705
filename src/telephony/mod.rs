//! Telephony provider ports
//!
//! The delivery core talks to the telephony provider only through these
//! traits. `signalwire` implements them over the SignalWire Relay realtime
//! API; tests substitute in-memory fakes.

pub mod relay;
pub mod signalwire;

pub use signalwire::SignalWireProvider;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{method} rejected: {message}")]
    Rejected { method: String, message: String },

    #[error("call failed: {0}")]
    CallFailed(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// An outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// A text-to-speech playback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsPlayback {
    /// SSML markup
    pub text: String,
    /// Voice profile identifier, e.g. `polly.Ruth`
    pub voice: String,
}

/// Playback lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Updated(String),
    Ended,
    Failed(String),
}

impl PlaybackEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackEvent::Ended | PlaybackEvent::Failed(_))
    }
}

/// Receiver for one playback's events. The sender is dropped after a
/// terminal event or when the provider session goes away.
pub type PlaybackEvents = mpsc::Receiver<PlaybackEvent>;

/// Messaging and voice capabilities of the telephony provider.
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Send a text message, returning the provider's message id.
    async fn send_sms(&self, sms: &OutboundSms) -> Result<String>;

    /// Dial `to` from `from`; resolves once the call is answered.
    async fn dial(&self, from: &str, to: &str) -> Result<Box<dyn ActiveCall>>;
}

/// A connected call.
#[async_trait]
pub trait ActiveCall: Send + Sync {
    /// Provider call identifier.
    fn sid(&self) -> &str;

    /// Start speech playback and return its event stream.
    async fn play_tts(&self, playback: &TtsPlayback) -> Result<PlaybackEvents>;

    async fn hangup(&self) -> Result<()>;
}
