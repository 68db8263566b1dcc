//! Diesel repositories and HTTP clients behind the domain ports.

pub mod address_repo;
pub mod booking_repo;
pub mod models;
pub mod order_repo;
pub mod outbox_repo;
pub mod resend;
pub mod stripe;

#[cfg(test)]
pub(crate) mod test_db;

pub use address_repo::DieselSavedAddressRepository;
pub use booking_repo::DieselBookingRepository;
pub use order_repo::DieselOrderRepository;
pub use outbox_repo::DieselOutboxRepository;
pub use resend::ResendEmailSender;
pub use stripe::{StripeGateway, StripeWebhookVerifier};
