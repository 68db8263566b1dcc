use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::AppServices;
use crate::domain::booking::{Booking, BookingRequest};
use crate::errors::AppError;

use super::auth::Identity;
use super::orders::{CancelRequest, CancelResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateBookingResponse {
    pub id: Uuid,
    pub tracking_token: String,
    pub client_secret: String,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub service_price_cents: i64,
    pub callout_fee_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
}

/// POST /bookings
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = BookingRequest,
    responses(
        (status = 201, description = "Booking created", body = CreateBookingResponse),
        (status = 400, description = "Validation failed"),
        (status = 502, description = "Payment processor unavailable"),
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    services: web::Data<AppServices>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let created = web::block(move || {
        let today = services.today();
        services.bookings.create_booking(request, today)
    })
    .await??;

    let booking = created.booking;
    Ok(HttpResponse::Created().json(CreateBookingResponse {
        id: booking.id,
        tracking_token: booking.tracking_token,
        client_secret: created.client_secret,
        preferred_date: booking.preferred_date,
        preferred_time_slot: booking.preferred_time_slot,
        service_price_cents: booking.service_price_cents,
        callout_fee_cents: booking.callout_fee_cents,
        gst_cents: booking.gst_cents,
        total_cents: booking.total_cents,
    }))
}

/// GET /bookings/{id}
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking found", body = Booking),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Booking not found"),
    ),
    security(("bearer" = [])),
    tag = "bookings"
)]
pub async fn get_booking(
    services: web::Data<AppServices>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let booking = web::block(move || services.bookings.get_booking(id)).await??;

    if !identity.is_admin() && !booking.email.eq_ignore_ascii_case(&identity.email) {
        return Err(AppError::NotFound);
    }
    Ok(HttpResponse::Ok().json(booking))
}

/// POST /bookings/{id}/cancel
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = CancelResponse),
        (status = 404, description = "No such booking for this email"),
        (status = 409, description = "The booking can no longer be cancelled"),
    ),
    tag = "bookings"
)]
pub async fn cancel_booking(
    services: web::Data<AppServices>,
    path: web::Path<Uuid>,
    body: web::Json<CancelRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let email = body.into_inner().email;
    let booking = web::block(move || services.bookings.cancel_booking(id, &email)).await??;

    Ok(HttpResponse::Ok().json(CancelResponse {
        id: booking.id,
        status: booking.status.to_string(),
        payment_status: booking.payment_status,
    }))
}
