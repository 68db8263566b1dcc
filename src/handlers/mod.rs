pub mod addresses;
pub mod admin;
pub mod auth;
pub mod bookings;
pub mod contact;
pub mod orders;
pub mod tracking;
pub mod webhooks;

use actix_web::{error, web, HttpRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::errors::AppError;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KeyCut API",
        description = "Key-copy orders, locksmith bookings, payments and admin operations."
    ),
    paths(
        orders::create_order,
        orders::get_order,
        orders::cancel_order,
        bookings::create_booking,
        bookings::get_booking,
        bookings::cancel_booking,
        webhooks::stripe_webhook,
        tracking::track,
        tracking::my_orders,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        contact::submit_contact,
        admin::list_orders,
        admin::list_bookings,
        admin::set_order_status,
        admin::set_booking_status,
        admin::assign_locksmith,
        admin::decide_verification,
        admin::bulk_status,
        admin::export_csv,
        admin::stats,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "orders", description = "Key-copy orders"),
        (name = "bookings", description = "Locksmith bookings"),
        (name = "payments", description = "Payment processor callbacks"),
        (name = "tracking", description = "Status lookup"),
        (name = "addresses", description = "Saved delivery addresses"),
        (name = "contact", description = "Contact form"),
        (name = "admin", description = "Back-office operations"),
    )
)]
pub struct ApiDoc;

/// Malformed JSON bodies surface as field errors instead of actix's plain
/// text response.
fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("body", err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("query", err.to_string()).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request("path", err.to_string()).into()
}

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(256 * 1024).error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(
            web::scope("/orders")
                .route("", web::post().to(orders::create_order))
                .route("/{id}", web::get().to(orders::get_order))
                .route("/{id}/cancel", web::post().to(orders::cancel_order)),
        )
        .service(
            web::scope("/bookings")
                .route("", web::post().to(bookings::create_booking))
                .route("/{id}", web::get().to(bookings::get_booking))
                .route("/{id}/cancel", web::post().to(bookings::cancel_booking)),
        )
        .route("/webhooks/stripe", web::post().to(webhooks::stripe_webhook))
        .route("/track", web::get().to(tracking::track))
        .route("/my-orders", web::get().to(tracking::my_orders))
        .service(
            web::scope("/saved-addresses")
                .route("", web::get().to(addresses::list_addresses))
                .route("", web::post().to(addresses::create_address))
                .route("/{id}", web::patch().to(addresses::update_address))
                .route("/{id}", web::delete().to(addresses::delete_address)),
        )
        .route("/contact", web::post().to(contact::submit_contact))
        .service(
            web::scope("/admin")
                .route("/orders", web::get().to(admin::list_orders))
                .route("/orders/{id}/status", web::put().to(admin::set_order_status))
                .route("/orders/{id}/verification", web::post().to(admin::decide_verification))
                .route("/bookings", web::get().to(admin::list_bookings))
                .route("/bookings/{id}/status", web::put().to(admin::set_booking_status))
                .route("/bookings/{id}/assign", web::post().to(admin::assign_locksmith))
                .route("/bulk/status", web::post().to(admin::bulk_status))
                .route("/export", web::post().to(admin::export_csv))
                .route("/stats", web::get().to(admin::stats)),
        );
}
