//! SignalWire implementation of the telephony ports.
//!
//! Each operation opens its own Relay session; a dialed call keeps its session
//! alive until the call handle is dropped.

use super::relay::{next_event, with_timeout, RelayConfig, RelayEvent, RelaySession};
use super::{
    ActiveCall, OutboundSms, PlaybackEvent, PlaybackEvents, ProviderError, Result,
    TelephonyProvider, TtsPlayback,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

const MESSAGING_CONTEXT: &str = "default";

/// Telephony provider backed by the SignalWire Relay realtime API.
#[derive(Debug, Clone)]
pub struct SignalWireProvider {
    relay: RelayConfig,
    dial_timeout_secs: u32,
}

impl SignalWireProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            relay: RelayConfig {
                url: config.relay_url(),
                project: config.project_id.clone(),
                token: config.api_token.clone(),
                timeout: config.timeout(),
            },
            dial_timeout_secs: config.dial_timeout_secs,
        }
    }

    /// How long to wait for a dial outcome: the provider's ring timeout plus
    /// the request bound, or unbounded when no bound is configured.
    fn dial_wait(&self) -> Option<Duration> {
        self.relay
            .timeout
            .map(|t| t + Duration::from_secs(u64::from(self.dial_timeout_secs)))
    }
}

#[async_trait]
impl TelephonyProvider for SignalWireProvider {
    async fn send_sms(&self, sms: &OutboundSms) -> Result<String> {
        let session = RelaySession::connect(&self.relay).await?;
        let result = session
            .execute("messaging.send", messaging_params(sms))
            .await?;

        result
            .get("message_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Rejected {
                method: "messaging.send".to_string(),
                message: "response carried no message_id".to_string(),
            })
    }

    async fn dial(&self, from: &str, to: &str) -> Result<Box<dyn ActiveCall>> {
        let session = Arc::new(RelaySession::connect(&self.relay).await?);
        let tag = Uuid::new_v4().to_string();

        let mut events = session.subscribe();
        session
            .execute(
                "calling.dial",
                dial_params(&tag, from, to, self.dial_timeout_secs),
            )
            .await?;

        let call = with_timeout(self.dial_wait(), "dial answer", async {
            loop {
                match next_event(&mut events).await {
                    Ok(event) => {
                        if let Some(outcome) = dial_outcome(&event, &tag) {
                            return outcome;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        })
        .await??;

        debug!(call_id = %call.call_id, "call answered");
        Ok(Box::new(RelayCall {
            session,
            call_id: call.call_id,
            node_id: call.node_id,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnsweredCall {
    pub call_id: String,
    pub node_id: String,
}

/// A call placed through a Relay session.
pub struct RelayCall {
    session: Arc<RelaySession>,
    call_id: String,
    node_id: String,
}

#[async_trait]
impl ActiveCall for RelayCall {
    fn sid(&self) -> &str {
        &self.call_id
    }

    async fn play_tts(&self, playback: &TtsPlayback) -> Result<PlaybackEvents> {
        let control_id = Uuid::new_v4().to_string();
        let mut events = self.session.subscribe();
        self.session
            .execute(
                "calling.play",
                play_params(&self.node_id, &self.call_id, &control_id, playback),
            )
            .await?;

        let (tx, rx) = mpsc::channel(16);
        let call_id = self.call_id.clone();
        tokio::spawn(async move {
            forward_playback(&mut events, &call_id, &control_id, tx).await;
        });
        Ok(rx)
    }

    async fn hangup(&self) -> Result<()> {
        self.session
            .execute(
                "calling.end",
                json!({
                    "node_id": self.node_id,
                    "call_id": self.call_id,
                    "reason": "hangup",
                }),
            )
            .await
            .map(|_| ())
    }
}

async fn forward_playback(
    events: &mut broadcast::Receiver<RelayEvent>,
    call_id: &str,
    control_id: &str,
    tx: mpsc::Sender<PlaybackEvent>,
) {
    let mut started = false;
    loop {
        let update = match next_event(events).await {
            Ok(event) => match playback_event(&event, call_id, control_id, &mut started) {
                Some(update) => update,
                None => continue,
            },
            Err(e) => {
                warn!(call_id, error = %e, "playback event stream ended");
                PlaybackEvent::Failed(e.to_string())
            }
        };
        let terminal = update.is_terminal();
        if tx.send(update).await.is_err() || terminal {
            break;
        }
    }
}

pub(crate) fn messaging_params(sms: &OutboundSms) -> Value {
    json!({
        "context": MESSAGING_CONTEXT,
        "from_number": sms.from,
        "to_number": sms.to,
        "body": sms.body,
    })
}

pub(crate) fn dial_params(tag: &str, from: &str, to: &str, timeout_secs: u32) -> Value {
    json!({
        "tag": tag,
        "devices": [[{
            "type": "phone",
            "params": {
                "from_number": from,
                "to_number": to,
                "timeout": timeout_secs,
            }
        }]],
    })
}

pub(crate) fn play_params(
    node_id: &str,
    call_id: &str,
    control_id: &str,
    playback: &TtsPlayback,
) -> Value {
    json!({
        "node_id": node_id,
        "call_id": call_id,
        "control_id": control_id,
        "play": [{
            "type": "tts",
            "params": { "text": playback.text, "voice": playback.voice },
        }],
    })
}

/// Map a `calling.call.dial` event for `tag` to the dial outcome.
pub(crate) fn dial_outcome(event: &RelayEvent, tag: &str) -> Option<Result<AnsweredCall>> {
    if event.event_type != "calling.call.dial" || event.str_param("tag") != Some(tag) {
        return None;
    }
    match event.str_param("dial_state")? {
        "answered" => {
            let call = event.params.get("call")?;
            let field = |key: &str| call.get(key).and_then(Value::as_str).map(str::to_string);
            Some(match (field("call_id"), field("node_id")) {
                (Some(call_id), Some(node_id)) => Ok(AnsweredCall { call_id, node_id }),
                _ => Err(ProviderError::CallFailed(
                    "answered call carried no identifiers".to_string(),
                )),
            })
        }
        "failed" => Some(Err(ProviderError::CallFailed(
            event
                .params
                .pointer("/call/end_reason")
                .and_then(Value::as_str)
                .unwrap_or("dial failed")
                .to_string(),
        ))),
        _ => None,
    }
}

/// Map a relay event to a playback notification for `control_id`.
pub(crate) fn playback_event(
    event: &RelayEvent,
    call_id: &str,
    control_id: &str,
    started: &mut bool,
) -> Option<PlaybackEvent> {
    match event.event_type.as_str() {
        "calling.call.play" if event.str_param("control_id") == Some(control_id) => {
            Some(match event.str_param("state")? {
                "playing" if !*started => {
                    *started = true;
                    PlaybackEvent::Started
                }
                "finished" => PlaybackEvent::Ended,
                "error" => PlaybackEvent::Failed("playback error".to_string()),
                other => PlaybackEvent::Updated(other.to_string()),
            })
        }
        "calling.call.state"
            if event.str_param("call_id") == Some(call_id)
                && event.str_param("call_state") == Some("ended") =>
        {
            Some(PlaybackEvent::Failed(
                "call ended before playback finished".to_string(),
            ))
        }
        _ => None,
    }
}
