//! In-memory provider fakes and request helpers shared by the hook tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use otp_relay::config::HookConfig;
use otp_relay::hook::TelephonyHook;
use otp_relay::lookup::{LineType, LineTypeInfo, LineTypeLookup, LookupError};
use otp_relay::server;
use otp_relay::telephony::{
    ActiveCall, OutboundSms, PlaybackEvent, PlaybackEvents, ProviderError, Result,
    TelephonyProvider, TtsPlayback,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const SECRET: &str = "hook-secret";
pub const FROM_NUMBER: &str = "+15550001111";

/// Records every provider interaction.
#[derive(Default)]
pub struct FakeProvider {
    pub sent: Mutex<Vec<OutboundSms>>,
    pub dials: Mutex<Vec<(String, String)>>,
    pub played: Arc<Mutex<Vec<TtsPlayback>>>,
    pub hangups: Arc<AtomicUsize>,
    /// Sender side of the most recent playback, filled once the call starts playing.
    pub playback: Arc<Mutex<Option<mpsc::Sender<PlaybackEvent>>>>,
    pub fail_sms: Option<ProviderError>,
    pub fail_dial: Option<ProviderError>,
}

impl FakeProvider {
    pub fn sms_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().len()
    }

    pub fn hangup_count(&self) -> usize {
        self.hangups.load(Ordering::SeqCst)
    }

    /// Wait for the background playback to request its event stream.
    pub async fn playback_sender(&self) -> mpsc::Sender<PlaybackEvent> {
        for _ in 0..200 {
            if let Some(tx) = self.playback.lock().clone() {
                return tx;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("playback never started");
    }
}

#[async_trait]
impl TelephonyProvider for FakeProvider {
    async fn send_sms(&self, sms: &OutboundSms) -> Result<String> {
        if let Some(e) = &self.fail_sms {
            return Err(e.clone());
        }
        let mut sent = self.sent.lock();
        sent.push(sms.clone());
        Ok(format!("SM{:04}", sent.len()))
    }

    async fn dial(&self, from: &str, to: &str) -> Result<Box<dyn ActiveCall>> {
        if let Some(e) = &self.fail_dial {
            return Err(e.clone());
        }
        let mut dials = self.dials.lock();
        dials.push((from.to_string(), to.to_string()));
        Ok(Box::new(FakeCall {
            sid: format!("CA{:04}", dials.len()),
            played: self.played.clone(),
            hangups: self.hangups.clone(),
            playback: self.playback.clone(),
        }))
    }
}

struct FakeCall {
    sid: String,
    played: Arc<Mutex<Vec<TtsPlayback>>>,
    hangups: Arc<AtomicUsize>,
    playback: Arc<Mutex<Option<mpsc::Sender<PlaybackEvent>>>>,
}

#[async_trait]
impl ActiveCall for FakeCall {
    fn sid(&self) -> &str {
        &self.sid
    }

    async fn play_tts(&self, playback: &TtsPlayback) -> Result<PlaybackEvents> {
        self.played.lock().push(playback.clone());
        let (tx, rx) = mpsc::channel(8);
        *self.playback.lock() = Some(tx);
        Ok(rx)
    }

    async fn hangup(&self) -> Result<()> {
        self.hangups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Answers every lookup with the same outcome.
pub struct FakeLookup {
    outcome: std::result::Result<LineType, LookupError>,
    pub calls: AtomicUsize,
}

impl FakeLookup {
    pub fn line_type(raw: Option<&str>) -> Self {
        Self {
            outcome: Ok(LineType::classify(raw)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: LookupError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineTypeLookup for FakeLookup {
    async fn lookup(&self, _phone_number: &str) -> std::result::Result<LineTypeInfo, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map(|line_type| LineTypeInfo { line_type })
    }
}

pub fn test_config() -> HookConfig {
    let mut config = HookConfig::default();
    config.auth.secret = SECRET.to_string();
    config.provider.project_id = "project".to_string();
    config.provider.api_token = "token".to_string();
    config.provider.space = "example.signalwire.com".to_string();
    config.provider.from_number = FROM_NUMBER.to_string();
    config
}

pub fn app(provider: Arc<FakeProvider>, lookup: Arc<FakeLookup>) -> Router {
    server::router(Arc::new(TelephonyHook::new(&test_config(), provider, lookup)))
}

pub fn event(phone: &str, otp: &str, channel: &str) -> Value {
    serde_json::json!({
        "eventType": "com.okta.telephony.provider",
        "data": {
            "messageProfile": {
                "phoneNumber": phone,
                "otpCode": otp,
                "deliveryChannel": channel,
            }
        }
    })
}

/// POST `body` to `path` with the given secret header, returning status and JSON.
pub async fn post_raw(
    app: Router,
    path: &str,
    secret: Option<(&str, &str)>,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some((name, value)) = secret {
        builder = builder.header(name, value);
    }
    let response = app
        .oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn post(app: Router, body: &Value) -> (StatusCode, Value) {
    post_raw(app, "/", Some(("auth_secret", SECRET)), body.to_string()).await
}

pub fn error_summary(body: &Value) -> &str {
    body["error"]["errorSummary"].as_str().unwrap_or_default()
}
