use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::AppServices;
use crate::domain::order::{Order, OrderRequest};
use crate::domain::payment::PaymentStatus;
use crate::errors::AppError;

use super::auth::Identity;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub id: Uuid,
    pub tracking_token: String,
    /// Handed to the payment form to confirm the charge.
    pub client_secret: String,
    pub subtotal_cents: i64,
    pub delivery_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
}

/// Identifies the customer by the email on the record.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub id: Uuid,
    pub status: String,
    pub payment_status: PaymentStatus,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Validates and prices the order, opens a payment intent and stores the
/// order together with the admin alert in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Validation failed"),
        (status = 502, description = "Payment processor unavailable"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    services: web::Data<AppServices>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let created = web::block(move || services.orders.create_order(request)).await??;

    let order = created.order;
    Ok(HttpResponse::Created().json(CreateOrderResponse {
        id: order.id,
        tracking_token: order.tracking_token,
        client_secret: created.client_secret,
        subtotal_cents: order.subtotal_cents,
        delivery_cents: order.delivery_cents,
        gst_cents: order.gst_cents,
        total_cents: order.total_cents,
    }))
}

/// GET /orders/{id}
///
/// The owner or an admin may read the full order; anyone else gets 404.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    services: web::Data<AppServices>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || services.orders.get_order(id)).await??;

    if !identity.is_admin() && !order.email.eq_ignore_ascii_case(&identity.email) {
        return Err(AppError::NotFound);
    }
    Ok(HttpResponse::Ok().json(order))
}

/// POST /orders/{id}/cancel
///
/// Customer cancellation of an unpaid order that has not started cutting.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Order cancelled", body = CancelResponse),
        (status = 404, description = "No such order for this email"),
        (status = 409, description = "The order can no longer be cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    services: web::Data<AppServices>,
    path: web::Path<Uuid>,
    body: web::Json<CancelRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let email = body.into_inner().email;
    let order = web::block(move || services.orders.cancel_order(id, &email)).await??;

    Ok(HttpResponse::Ok().json(CancelResponse {
        id: order.id,
        status: order.status.to_string(),
        payment_status: order.payment_status,
    }))
}
