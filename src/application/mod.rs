pub mod address_service;
pub mod admin_service;
pub mod booking_service;
pub mod contact_service;
pub mod notification_dispatcher;
pub mod order_service;
pub mod payment_bridge;
pub mod tracking_service;
pub mod verification_service;

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};

use crate::domain::notification::EmailContext;
use crate::domain::ports::{
    BookingRepository, EmailSender, OrderRepository, OutboxRepository, PaymentGateway, SavedAddressRepository,
    WebhookVerifier,
};

use address_service::AddressService;
use admin_service::AdminService;
use booking_service::BookingService;
use contact_service::ContactService;
use notification_dispatcher::NotificationDispatcher;
use order_service::OrderService;
use payment_bridge::PaymentBridge;
use tracking_service::TrackingService;
use verification_service::VerificationService;

/// Storage and external-service adapters the services run against.
#[derive(Clone)]
pub struct Ports {
    pub orders: Arc<dyn OrderRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub addresses: Arc<dyn SavedAddressRepository>,
    pub outbox: Arc<dyn OutboxRepository>,
    pub payments: Arc<dyn PaymentGateway>,
    pub webhooks: Arc<dyn WebhookVerifier>,
    pub email: Arc<dyn EmailSender>,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub email: EmailContext,
    pub display_offset: FixedOffset,
    pub outbox_batch_size: i64,
    pub outbox_max_attempts: i32,
}

/// Every use case, shared by the HTTP handlers and the background
/// dispatcher.
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub bookings: Arc<BookingService>,
    pub verification: VerificationService,
    pub payments: PaymentBridge,
    pub admin: AdminService,
    pub tracking: TrackingService,
    pub addresses: AddressService,
    pub contact: ContactService,
    pub dispatcher: NotificationDispatcher,
    display_offset: FixedOffset,
}

impl AppServices {
    pub fn new(ports: Ports, settings: ServiceSettings) -> Self {
        let orders = Arc::new(OrderService::new(ports.orders.clone(), ports.payments.clone()));
        let bookings = Arc::new(BookingService::new(ports.bookings.clone(), ports.payments.clone()));
        Self {
            verification: VerificationService::new(ports.orders.clone()),
            payments: PaymentBridge::new(ports.orders.clone(), ports.bookings.clone(), ports.webhooks),
            admin: AdminService::new(
                orders.clone(),
                bookings.clone(),
                ports.orders.clone(),
                ports.bookings.clone(),
                settings.display_offset,
            ),
            tracking: TrackingService::new(ports.orders, ports.bookings),
            addresses: AddressService::new(ports.addresses),
            contact: ContactService::new(ports.outbox.clone()),
            dispatcher: NotificationDispatcher::new(
                ports.outbox,
                ports.email,
                settings.email,
                settings.outbox_batch_size,
                settings.outbox_max_attempts,
            ),
            orders,
            bookings,
            display_offset: settings.display_offset,
        }
    }

    /// The business's calendar date, used to reject bookings in the past.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.display_offset).date_naive()
    }
}
