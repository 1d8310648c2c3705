//! Hook orchestration: authenticate, dispatch, deliver, build the envelope.

use super::dispatch::ChannelDispatcher;
use super::envelope::{ResponseBuilder, ResponseEnvelope};
use super::error::{HookError, Result};
use super::request::{DeliveryChannel, TelephonyEvent};
use crate::auth::{CaseInsensitiveHeaders, RequestAuthenticator};
use crate::config::HookConfig;
use crate::delivery::{DeliveryResult, SmsDeliverer, VoiceDeliverer};
use crate::logging::mask_phone;
use crate::lookup::{EligibilityChecker, LineTypeLookup, SignalWireLookup};
use crate::telephony::{SignalWireProvider, TelephonyProvider};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Message returned if delivery panics; the panic itself is only logged.
const INTERNAL_ERROR: &str = "Internal error while delivering the code";

/// The telephony inline hook.
#[derive(Clone)]
pub struct TelephonyHook {
    authenticator: RequestAuthenticator,
    dispatcher: ChannelDispatcher,
    eligibility: EligibilityChecker,
    sms: SmsDeliverer,
    voice: VoiceDeliverer,
}

impl TelephonyHook {
    /// Build a hook over the given provider ports.
    pub fn new(
        config: &HookConfig,
        provider: Arc<dyn TelephonyProvider>,
        lookup: Arc<dyn LineTypeLookup>,
    ) -> Self {
        let p = &config.provider;
        Self {
            authenticator: RequestAuthenticator::new(config.auth.secret.clone()),
            dispatcher: ChannelDispatcher,
            eligibility: EligibilityChecker::new(lookup),
            sms: SmsDeliverer::new(provider.clone(), p.name.clone(), p.from_number.clone()),
            voice: VoiceDeliverer::new(
                provider,
                p.name.clone(),
                p.from_number.clone(),
                p.voice.clone(),
            ),
        }
    }

    /// Build a hook wired to SignalWire.
    pub fn from_config(config: &HookConfig) -> Self {
        Self::new(
            config,
            Arc::new(SignalWireProvider::new(&config.provider)),
            Arc::new(SignalWireLookup::new(&config.provider)),
        )
    }

    /// Handle one invocation. Always resolves to an envelope; failures are
    /// logged and turned into the error shape.
    pub async fn handle(
        &self,
        headers: &CaseInsensitiveHeaders,
        body: &[u8],
    ) -> ResponseEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!("telephony_hook", %request_id, channel = tracing::field::Empty);

        async move {
            match AssertUnwindSafe(self.process(headers, body))
                .catch_unwind()
                .await
            {
                Ok(Ok(result)) => {
                    info!(
                        provider = %result.provider_name,
                        transaction_id = %result.transaction_id,
                        "OTP delivered"
                    );
                    ResponseBuilder::success(result)
                }
                Ok(Err(e)) => {
                    error!(kind = e.kind(), error = %e, "OTP delivery failed");
                    ResponseBuilder::error(e.to_string())
                }
                Err(_) => {
                    error!("OTP delivery panicked");
                    ResponseBuilder::error(INTERNAL_ERROR)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        headers: &CaseInsensitiveHeaders,
        body: &[u8],
    ) -> Result<DeliveryResult> {
        self.authenticator.authenticate(headers).map_err(|failure| {
            warn!(reason = failure.message(), "request rejected");
            HookError::Authentication
        })?;

        let event = TelephonyEvent::from_slice(body);
        let request = self.dispatcher.dispatch(&event)?;
        tracing::Span::current().record("channel", request.channel().as_str());
        info!(to = %mask_phone(request.phone_number()), "delivering OTP");

        match request.channel() {
            DeliveryChannel::Sms => {
                self.eligibility.check_sms(request.phone_number()).await?;
                self.sms
                    .deliver(request.phone_number(), request.otp_code())
                    .await
            }
            DeliveryChannel::Call => {
                // Dropping the playback handle detaches it from this request.
                let delivery = self
                    .voice
                    .deliver(request.phone_number(), request.otp_code())
                    .await?;
                Ok(delivery.result)
            }
        }
    }
}
