use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::application::tracking_service::{CustomerHistory, TrackingView};
use crate::application::AppServices;
use crate::errors::AppError;

use super::auth::Identity;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrackQuery {
    /// Order or booking id, or a tracking token such as `KC-7F3K9Q2MXA`.
    #[serde(default)]
    pub query: String,
}

/// GET /track
///
/// Public status lookup. Contact details are never included.
#[utoipa::path(
    get,
    path = "/track",
    params(TrackQuery),
    responses(
        (status = 200, description = "Record found", body = TrackingView),
        (status = 400, description = "Query missing"),
        (status = 404, description = "No order or booking matches"),
    ),
    tag = "tracking"
)]
pub async fn track(
    services: web::Data<AppServices>,
    query: web::Query<TrackQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner().query;
    let view = web::block(move || services.tracking.track(&query)).await??;
    Ok(HttpResponse::Ok().json(view))
}

/// GET /my-orders
///
/// The signed-in customer's orders and bookings, newest first.
#[utoipa::path(
    get,
    path = "/my-orders",
    responses(
        (status = 200, description = "Customer history", body = CustomerHistory),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "tracking"
)]
pub async fn my_orders(services: web::Data<AppServices>, identity: Identity) -> Result<HttpResponse, AppError> {
    let history = web::block(move || services.tracking.history_for(&identity.email)).await??;
    Ok(HttpResponse::Ok().json(history))
}
