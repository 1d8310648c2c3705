//! Voice delivery
//!
//! Places a call, then hands the call to a detached playback task that reads
//! the code out twice and hangs up once playback ends. The caller gets its
//! result as soon as the call is placed.

use super::DeliveryResult;
use crate::hook::error::HookError;
use crate::telephony::{ActiveCall, PlaybackEvent, TelephonyProvider, TtsPlayback};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

/// SSML read to the user: greeting, the code digit by digit at x-slow rate,
/// a one second pause, then the code again.
pub fn speech_markup(code: &str) -> String {
    let spaced = spaced_digits(code);
    format!(
        "<speak>\
         Hello! Your verification code is <prosody rate=\"x-slow\">{spaced}</prosody> \
         <break time=\"1s\"/> \
         Again, your verification code is <prosody rate=\"x-slow\">{spaced}</prosody>\
         </speak>"
    )
}

/// `"123456"` -> `"1 2 3 4 5 6"`, XML-escaped.
fn spaced_digits(code: &str) -> String {
    code.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&apos;".to_string(),
            c => c.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Playback lifecycle of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSessionState {
    Placed,
    Playing,
    Ended,
    Failed,
}

impl VoiceSessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, VoiceSessionState::Ended | VoiceSessionState::Failed)
    }
}

/// What the session wants done to the call after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    None,
    Hangup,
}

/// Ephemeral per-call state, owned by the playback task.
#[derive(Debug, Clone)]
pub struct VoiceSession {
    call_sid: String,
    state: VoiceSessionState,
    placed_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl VoiceSession {
    pub fn new(call_sid: impl Into<String>) -> Self {
        Self {
            call_sid: call_sid.into(),
            state: VoiceSessionState::Placed,
            placed_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn state(&self) -> VoiceSessionState {
        self.state
    }

    pub fn call_sid(&self) -> &str {
        &self.call_sid
    }

    /// Apply a playback event. Events after a terminal state are ignored.
    pub fn apply(&mut self, event: &PlaybackEvent) -> SessionAction {
        if self.state.is_terminal() {
            return SessionAction::None;
        }
        match event {
            PlaybackEvent::Started => {
                info!(call_sid = %self.call_sid, "playback started");
                self.state = VoiceSessionState::Playing;
                SessionAction::None
            }
            PlaybackEvent::Updated(state) => {
                info!(call_sid = %self.call_sid, playback_state = %state, "playback updated");
                self.state = VoiceSessionState::Playing;
                SessionAction::None
            }
            PlaybackEvent::Ended => {
                info!(call_sid = %self.call_sid, "playback ended");
                self.finish(VoiceSessionState::Ended);
                SessionAction::Hangup
            }
            PlaybackEvent::Failed(reason) => {
                // The call is left to the provider's own timeout.
                warn!(call_sid = %self.call_sid, %reason, "playback failed");
                self.finish(VoiceSessionState::Failed);
                SessionAction::None
            }
        }
    }

    fn finish(&mut self, state: VoiceSessionState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    /// Drive playback for `call` to completion.
    pub async fn run(
        mut self,
        call: Box<dyn ActiveCall>,
        playback: TtsPlayback,
    ) -> VoiceSessionState {
        let mut events = match call.play_tts(&playback).await {
            Ok(events) => events,
            Err(e) => {
                self.apply(&PlaybackEvent::Failed(e.to_string()));
                return self.state;
            }
        };

        while let Some(event) = events.recv().await {
            if self.apply(&event) == SessionAction::Hangup {
                if let Err(e) = call.hangup().await {
                    error!(call_sid = %self.call_sid, error = %e, "hangup failed");
                    self.finish(VoiceSessionState::Failed);
                }
                break;
            }
            if self.state.is_terminal() {
                break;
            }
        }

        if !self.state.is_terminal() {
            self.apply(&PlaybackEvent::Failed(
                "playback events ended without a result".to_string(),
            ));
        }

        let duration_ms = self
            .finished_at
            .map(|end| (end - self.placed_at).num_milliseconds())
            .unwrap_or_default();
        info!(
            call_sid = %self.call_sid,
            state = ?self.state,
            duration_ms,
            "voice session finished"
        );
        self.state
    }
}

/// A placed call and its detached playback task.
#[derive(Debug)]
pub struct VoiceDelivery {
    pub result: DeliveryResult,
    /// Resolves with the final session state. Dropping it detaches the task.
    pub playback: JoinHandle<VoiceSessionState>,
}

/// Delivers the OTP by phone call.
#[derive(Clone)]
pub struct VoiceDeliverer {
    provider: Arc<dyn TelephonyProvider>,
    provider_name: String,
    from_number: String,
    voice: String,
}

impl VoiceDeliverer {
    pub fn new(
        provider: Arc<dyn TelephonyProvider>,
        provider_name: impl Into<String>,
        from_number: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            from_number: from_number.into(),
            voice: voice.into(),
        }
    }

    /// Returns once the call is placed; playback continues in the background.
    pub async fn deliver(&self, to: &str, code: &str) -> Result<VoiceDelivery, HookError> {
        let call = self
            .provider
            .dial(&self.from_number, to)
            .await
            .map_err(|e| {
                error!(error = %e, "call placement failed");
                HookError::CallPlacement(e.to_string())
            })?;

        let call_sid = call.sid().to_string();
        info!(call_sid = %call_sid, "call placed");

        let playback = TtsPlayback {
            text: speech_markup(code),
            voice: self.voice.clone(),
        };
        let session = VoiceSession::new(call_sid.clone());
        let handle = tokio::spawn(
            session
                .run(call, playback)
                .instrument(tracing::Span::current()),
        );

        Ok(VoiceDelivery {
            result: DeliveryResult::successful(&self.provider_name, call_sid),
            playback: handle,
        })
    }
}
