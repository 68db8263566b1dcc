use uuid::Uuid;

use super::address::{NewSavedAddress, SavedAddress, SavedAddressPatch};
use super::booking::{Assignment, Booking, BookingState, NewBooking};
use super::errors::DomainError;
use super::lifecycle::Audit;
use super::notification::{EmailMessage, Notification};
use super::order::{NewOrder, Order, OrderState};
use super::outbox::OutboxMessage;
use super::payment::{IntentRequest, PaymentEvent, PaymentIntent};

#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Extra columns written together with an order's state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderExtras {
    pub tracking_number: Option<String>,
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts the order and its outbox messages in one transaction.
    fn create(&self, order: NewOrder, notifications: &[Notification]) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Order>, DomainError>;
    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError>;
    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError>;
    /// Newest first.
    fn list_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Order>, DomainError>;
    fn all(&self) -> Result<Vec<Order>, DomainError>;
    /// Writes `next` only if the row still holds `expected`, together with a
    /// status-history row and the outbox messages. `None` means the row moved
    /// on in the meantime and nothing was written.
    fn transition(
        &self,
        id: Uuid,
        expected: OrderState,
        next: OrderState,
        extras: &OrderExtras,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Order>, DomainError>;
}

pub trait BookingRepository: Send + Sync + 'static {
    fn create(&self, booking: NewBooking, notifications: &[Notification]) -> Result<Booking, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError>;
    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Booking>, DomainError>;
    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Booking>, DomainError>;
    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Booking>, DomainError>;
    fn list_by_email(&self, email: &str) -> Result<Vec<Booking>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Booking>, DomainError>;
    fn all(&self) -> Result<Vec<Booking>, DomainError>;
    /// Conditional update as for orders. `assignment`, when given, replaces
    /// the assigned locksmith.
    fn transition(
        &self,
        id: Uuid,
        expected: BookingState,
        next: BookingState,
        assignment: Option<&Assignment>,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Booking>, DomainError>;
}

pub trait SavedAddressRepository: Send + Sync + 'static {
    /// Default first, then oldest first.
    fn list_by_email(&self, email: &str) -> Result<Vec<SavedAddress>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<SavedAddress>, DomainError>;
    /// Clears any other default for the same email in the same transaction.
    fn create(&self, address: NewSavedAddress) -> Result<SavedAddress, DomainError>;
    fn update(&self, id: Uuid, patch: SavedAddressPatch) -> Result<Option<SavedAddress>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait OutboxRepository: Send + Sync + 'static {
    fn enqueue(&self, notification: &Notification) -> Result<(), DomainError>;
    /// Undelivered messages with fewer than `max_attempts` failures, oldest first.
    fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>, DomainError>;
    fn mark_dispatched(&self, id: Uuid) -> Result<(), DomainError>;
    fn record_failure(&self, id: Uuid, error: &str) -> Result<(), DomainError>;
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, DomainError>;
    fn cancel_intent(&self, intent_id: &str) -> Result<(), DomainError>;
}

/// Authenticates and decodes inbound processor notifications.
pub trait WebhookVerifier: Send + Sync + 'static {
    fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<PaymentEvent, DomainError>;
}

pub trait EmailSender: Send + Sync + 'static {
    fn send(&self, message: &EmailMessage) -> Result<(), DomainError>;
}
