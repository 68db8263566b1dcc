pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::AppServices;
use handlers::auth::JwtKeys;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or spawning) the returned
/// server.
pub fn build_server(
    services: web::Data<AppServices>,
    jwt: web::Data<JwtKeys>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = handlers::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(services.clone())
            .app_data(jwt.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((host.to_string(), port))?
    .run())
}

/// Drains the notification outbox every `interval` on the actix runtime.
/// Each pass runs on the blocking pool; storage errors are logged and the
/// loop carries on.
pub fn spawn_outbox_dispatcher(services: web::Data<AppServices>, interval: Duration) {
    let services: Arc<AppServices> = services.into_inner();
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(interval);
        loop {
            ticker.tick().await;
            let services = services.clone();
            match web::block(move || services.dispatcher.dispatch_pending()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log::error!("Outbox dispatch failed: {e}"),
                Err(e) => log::error!("Outbox dispatch task failed: {e}"),
            }
        }
    });
}
