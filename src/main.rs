use std::sync::Arc;

use actix_web::web;
use dotenvy::dotenv;
use keycut_service::application::{AppServices, Ports, ServiceSettings};
use keycut_service::config::AppConfig;
use keycut_service::domain::notification::EmailContext;
use keycut_service::handlers::auth::JwtKeys;
use keycut_service::infrastructure::{
    DieselBookingRepository, DieselOrderRepository, DieselOutboxRepository, DieselSavedAddressRepository,
    ResendEmailSender, StripeGateway, StripeWebhookVerifier,
};
use keycut_service::{build_server, create_pool, run_migrations, spawn_outbox_dispatcher};

// The HTTP clients are blocking, so they are built here before the actix
// runtime starts.
fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().expect("Invalid configuration");

    let pool = create_pool(&config.database_url).expect("Failed to create database connection pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let ports = Ports {
        orders: Arc::new(DieselOrderRepository::new(pool.clone())),
        bookings: Arc::new(DieselBookingRepository::new(pool.clone())),
        addresses: Arc::new(DieselSavedAddressRepository::new(pool.clone())),
        outbox: Arc::new(DieselOutboxRepository::new(pool)),
        payments: Arc::new(
            StripeGateway::new(config.stripe_api_base.clone(), config.stripe_secret_key.clone())
                .expect("Failed to build Stripe client"),
        ),
        webhooks: Arc::new(StripeWebhookVerifier::new(
            config.stripe_webhook_secret.clone(),
            config.stripe_webhook_tolerance_secs,
        )),
        email: Arc::new(
            ResendEmailSender::new(
                config.resend_api_url.clone(),
                config.resend_api_key.clone(),
                config.email_from.clone(),
            )
            .expect("Failed to build Resend client"),
        ),
    };
    let settings = ServiceSettings {
        email: EmailContext {
            admin_email: config.admin_email.clone(),
            app_url: config.app_url.clone(),
        },
        display_offset: config.display_offset,
        outbox_batch_size: config.outbox_batch_size,
        outbox_max_attempts: config.outbox_max_attempts,
    };
    let services = web::Data::new(AppServices::new(ports, settings));
    let jwt = web::Data::new(JwtKeys::new(config.jwt_secret.as_bytes()));

    actix_web::rt::System::new().block_on(async move {
        spawn_outbox_dispatcher(services.clone(), config.outbox_poll_interval);

        log::info!("Starting server at http://{}:{}", config.host, config.port);
        build_server(services, jwt, &config.host, config.port)?.await
    })
}
