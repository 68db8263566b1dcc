//! Stripe payment intents and webhook authentication.

use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::errors::DomainError;
use crate::domain::payment::{IntentRequest, PaymentEvent, PaymentIntent, CURRENCY};
use crate::domain::ports::{PaymentGateway, WebhookVerifier};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

fn upstream(context: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::Upstream(format!("stripe {context}: {err}"))
}

/// Creates and cancels payment intents over the Stripe REST API.
///
/// Uses a blocking client; call it from `web::block` or another blocking
/// context, never directly on the async runtime.
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| upstream("client", e))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn check(context: &str, response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());
        Err(upstream(context, message))
    }
}

impl PaymentGateway for StripeGateway {
    fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, DomainError> {
        let entity_id = request.entity_id.to_string();
        let params = [
            ("amount", request.amount_cents.to_string()),
            ("currency", CURRENCY.to_string()),
            ("metadata[entity_id]", entity_id.clone()),
            ("metadata[entity_type]", request.entity.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", entity_id)
            .form(&params)
            .send()
            .map_err(|e| upstream("create intent", e))?;

        let intent: IntentResponse = Self::check("create intent", response)?
            .json()
            .map_err(|e| upstream("create intent", e))?;
        log::debug!("created payment intent {} for {} {}", intent.id, request.entity, request.entity_id);
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    fn cancel_intent(&self, intent_id: &str) -> Result<(), DomainError> {
        let response = self
            .client
            .post(format!("{}/v1/payment_intents/{intent_id}/cancel", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .map_err(|e| upstream("cancel intent", e))?;
        Self::check("cancel intent", response)?;
        Ok(())
    }
}

// ── Webhooks ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: String,
}

/// Decodes an already authenticated event body.
pub fn parse_event(payload: &[u8]) -> Result<PaymentEvent, DomainError> {
    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| DomainError::validation("payload", format!("Malformed webhook event: {e}")))?;
    let intent_id = event.data.object.id;
    Ok(match event.event_type.as_str() {
        "payment_intent.succeeded" => PaymentEvent::Succeeded { intent_id },
        "payment_intent.payment_failed" => PaymentEvent::Failed { intent_id },
        _ => PaymentEvent::Ignored {
            event_type: event.event_type,
        },
    })
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!());
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Builds a `Stripe-Signature` header value for `payload`.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let timestamp = timestamp.to_string();
    let signature = hex::encode(signed_mac(secret, &timestamp, payload).finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

/// Checks the `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) against
/// the endpoint secret and rejects stale timestamps.
pub struct StripeWebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: String, tolerance_secs: i64) -> Self {
        Self { secret, tolerance_secs }
    }

    pub fn verify_at(&self, payload: &[u8], header: Option<&str>, now: i64) -> Result<PaymentEvent, DomainError> {
        let header = header.ok_or(DomainError::SignatureInvalid)?;

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(DomainError::SignatureInvalid)?;
        let sent_at: i64 = timestamp.parse().map_err(|_| DomainError::SignatureInvalid)?;
        let skew = now.checked_sub(sent_at).map(i64::unsigned_abs);
        if skew.map_or(true, |skew| skew > self.tolerance_secs.unsigned_abs()) {
            log::warn!("webhook timestamp {sent_at} outside tolerance");
            return Err(DomainError::SignatureInvalid);
        }

        let authentic = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| signed_mac(&self.secret, timestamp, payload).verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if !authentic {
            return Err(DomainError::SignatureInvalid);
        }

        parse_event(payload)
    }
}

impl WebhookVerifier for StripeWebhookVerifier {
    fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<PaymentEvent, DomainError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }
}
