use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::admin_service::{AdminStats, BulkOutcome};
use crate::application::AppServices;
use crate::domain::booking::{Assignment, Booking, BookingStatus};
use crate::domain::entity::EntityKind;
use crate::domain::lifecycle::VerificationDecision;
use crate::domain::order::{Order, OrderStatus};
use crate::errors::AppError;

use super::auth::AdminIdentity;

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageParams {
    /// Page number (1-based, at most 100000). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

const MAX_PAGE: i64 = 100_000;

impl PageParams {
    fn clamped(&self) -> (i64, i64) {
        (self.page.clamp(1, MAX_PAGE), self.limit.clamp(1, 100))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingPage {
    pub items: Vec<Booking>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
    /// Carrier tracking number, usually sent with `shipped`.
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    pub order: Order,
    pub changed: bool,
    /// The normal-flow rule this override stepped over, if any.
    pub bypassed_rule: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingStatusResponse {
    pub booking: Booking,
    pub changed: bool,
    pub bypassed_rule: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerificationRequest {
    pub decision: VerificationDecision,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkStatusRequest {
    pub kind: EntityKind,
    pub ids: Vec<Uuid>,
    /// Target status name, checked against the kind's status set.
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    pub kind: EntityKind,
    pub ids: Vec<Uuid>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /admin/orders
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(PageParams),
    responses(
        (status = 200, description = "Newest orders first", body = OrderPage),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_orders(
    services: web::Data<AppServices>,
    _admin: AdminIdentity,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.clamped();
    let result = web::block(move || services.orders.list_orders(page, limit)).await??;
    Ok(HttpResponse::Ok().json(OrderPage {
        items: result.items,
        total: result.total,
        page,
        limit,
    }))
}

/// GET /admin/bookings
#[utoipa::path(
    get,
    path = "/admin/bookings",
    params(PageParams),
    responses(
        (status = 200, description = "Newest bookings first", body = BookingPage),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_bookings(
    services: web::Data<AppServices>,
    _admin: AdminIdentity,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.clamped();
    let result = web::block(move || services.bookings.list_bookings(page, limit)).await??;
    Ok(HttpResponse::Ok().json(BookingPage {
        items: result.items,
        total: result.total,
        page,
        limit,
    }))
}

/// PUT /admin/orders/{id}/status
///
/// Administrative override. Restricted keys still cannot pass verification
/// without approval.
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = OrderStatusResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed or concurrent change"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn set_order_status(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    path: web::Path<Uuid>,
    body: web::Json<OrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let req = body.into_inner();
    let change = web::block(move || {
        services
            .orders
            .set_status(id, req.status, req.tracking_number, &admin.email)
    })
    .await??;
    Ok(HttpResponse::Ok().json(OrderStatusResponse {
        order: change.entity,
        changed: change.changed,
        bypassed_rule: change.bypassed_rule,
    }))
}

/// PUT /admin/bookings/{id}/status
#[utoipa::path(
    put,
    path = "/admin/bookings/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    request_body = BookingStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = BookingStatusResponse),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Transition not allowed or concurrent change"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn set_booking_status(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    path: web::Path<Uuid>,
    body: web::Json<BookingStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status = body.into_inner().status;
    let change = web::block(move || services.bookings.set_status(id, status, &admin.email)).await??;
    Ok(HttpResponse::Ok().json(BookingStatusResponse {
        booking: change.entity,
        changed: change.changed,
        bypassed_rule: change.bypassed_rule,
    }))
}

/// POST /admin/bookings/{id}/assign
#[utoipa::path(
    post,
    path = "/admin/bookings/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    request_body = Assignment,
    responses(
        (status = 200, description = "Locksmith assigned", body = Booking),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking is not confirmed or assigned"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn assign_locksmith(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    path: web::Path<Uuid>,
    body: web::Json<Assignment>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let assignment = body.into_inner();
    let booking = web::block(move || services.bookings.assign_locksmith(id, assignment, &admin.email)).await??;
    Ok(HttpResponse::Ok().json(booking))
}

/// POST /admin/orders/{id}/verification
#[utoipa::path(
    post,
    path = "/admin/orders/{id}/verification",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = VerificationRequest,
    responses(
        (status = 200, description = "Decision recorded", body = Order),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting verification"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn decide_verification(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    path: web::Path<Uuid>,
    body: web::Json<VerificationRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let decision = body.into_inner().decision;
    let order = web::block(move || services.verification.decide(id, decision, &admin.email)).await??;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /admin/bulk/status
///
/// Each id is applied on its own; ids that cannot move are reported as
/// skipped rather than failing the batch.
#[utoipa::path(
    post,
    path = "/admin/bulk/status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Per-item outcome", body = BulkOutcome),
        (status = 400, description = "Unknown status or bad id list"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn bulk_status(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    body: web::Json<BulkStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let outcome = web::block(move || {
        services
            .admin
            .bulk_update_status(req.kind, &req.ids, &req.status, &admin.email)
    })
    .await??;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /admin/export
#[utoipa::path(
    post,
    path = "/admin/export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn export_csv(
    services: web::Data<AppServices>,
    admin: AdminIdentity,
    body: web::Json<ExportRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    if req.ids.is_empty() {
        return Err(AppError::bad_request("ids", "Select at least one item"));
    }
    let kind = req.kind;
    let csv = web::block(move || services.admin.export_csv(kind, &req.ids)).await??;

    log::info!(target: "audit", "admin {} exported {kind}s", admin.email);
    let filename = format!("{kind}s-export-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")))
        .body(csv))
}

/// GET /admin/stats
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Dashboard figures", body = AdminStats),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn stats(services: web::Data<AppServices>, _admin: AdminIdentity) -> Result<HttpResponse, AppError> {
    let stats = web::block(move || services.admin.stats()).await??;
    Ok(HttpResponse::Ok().json(stats))
}
