use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::AppServices;
use crate::domain::payment::ReconcileOutcome;
use crate::errors::AppError;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    /// applied | already_applied | unknown_intent | ignored
    pub outcome: &'static str,
}

fn outcome_name(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Applied { .. } => "applied",
        ReconcileOutcome::AlreadyApplied { .. } => "already_applied",
        ReconcileOutcome::UnknownIntent => "unknown_intent",
        ReconcileOutcome::Ignored => "ignored",
    }
}

/// POST /webhooks/stripe
///
/// Payment processor notifications. The raw body is needed for the
/// signature check, so it is taken as bytes rather than JSON. Unknown
/// intents are acknowledged with 200 so the processor stops retrying.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>"),
    ),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Signature invalid or payload malformed"),
        (status = 409, description = "Record kept changing; the processor should retry"),
    ),
    tag = "payments"
)]
pub async fn stripe_webhook(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let outcome = web::block(move || services.payments.handle_webhook(&body, signature.as_deref())).await??;

    Ok(HttpResponse::Ok().json(WebhookAck {
        received: true,
        outcome: outcome_name(&outcome),
    }))
}
