use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::application::contact_service::ContactRequest;
use crate::application::AppServices;
use crate::errors::AppError;

/// POST /contact
///
/// Queues the message for the admin mailbox; delivery happens in the
/// background.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactRequest,
    responses(
        (status = 202, description = "Message accepted"),
        (status = 400, description = "Validation failed"),
    ),
    tag = "contact"
)]
pub async fn submit_contact(
    services: web::Data<AppServices>,
    body: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    web::block(move || services.contact.submit(request)).await??;
    Ok(HttpResponse::Accepted().json(json!({ "received": true })))
}
