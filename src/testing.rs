//! In-memory port implementations and fixtures for service tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::address::{Address, NewSavedAddress, SavedAddress, SavedAddressPatch};
use crate::domain::booking::{
    Assignment, Booking, BookingRequest, BookingState, BookingStatus, NewBooking, ServiceType, Urgency,
};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::Audit;
use crate::domain::notification::{EmailMessage, Notification};
use crate::domain::order::{
    DeliveryMethod, KeyType, NewOrder, Order, OrderRequest, OrderState, OrderStatus, VerificationStatus,
};
use crate::domain::outbox::{OutboxEntry, OutboxMessage};
use crate::domain::payment::{IntentRequest, PaymentIntent, PaymentStatus};
use crate::domain::ports::{
    BookingRepository, EmailSender, ListResult, OrderExtras, OrderRepository, OutboxRepository, PaymentGateway,
    SavedAddressRepository,
};

pub fn sydney() -> Address {
    Address {
        street: "12 King Street".to_string(),
        unit: None,
        suburb: "Newtown".to_string(),
        state: "NSW".to_string(),
        postcode: "2042".to_string(),
    }
}

pub fn order_request(key_type: KeyType) -> OrderRequest {
    OrderRequest {
        email: "jane@example.com".to_string(),
        phone: Some("0412 345 678".to_string()),
        key_type,
        key_subtype: None,
        quantity: 2,
        photo_urls: vec!["https://files.example.com/key.jpg".to_string()],
        verification_photo_url: key_type
            .requires_verification()
            .then(|| "https://files.example.com/proof.jpg".to_string()),
        delivery_method: DeliveryMethod::Standard,
        delivery_address: sydney(),
        subtotal_cents: None,
        gst_cents: None,
        delivery_cents: None,
        total_cents: None,
    }
}

pub fn booking_request() -> BookingRequest {
    BookingRequest {
        name: "Sam Lee".to_string(),
        email: "sam@example.com".to_string(),
        phone: "0412 345 678".to_string(),
        service_type: ServiceType::Lockout,
        urgency: Urgency::Standard,
        service_description: Some("Locked out".to_string()),
        service_address: sydney(),
        access_instructions: None,
        preferred_date: (Utc::now().date_naive() + Duration::days(7))
            .format("%Y-%m-%d")
            .to_string(),
        preferred_time_slot: "9am-12pm".to_string(),
        service_price_cents: None,
        callout_fee_cents: None,
        gst_cents: None,
        total_cents: None,
    }
}

pub fn assignment() -> Assignment {
    Assignment {
        locksmith_id: Uuid::new_v4(),
        locksmith_name: "Alex Smith".to_string(),
        locksmith_phone: "0498 765 432".to_string(),
        estimated_arrival: None,
    }
}

/// A recorded status-history row.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub entity_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub audit: Audit,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryOutbox {
    messages: Mutex<Vec<OutboxMessage>>,
    dispatched: Mutex<HashSet<Uuid>>,
}

impl InMemoryOutbox {
    pub fn push(&self, notification: &Notification) -> Result<(), DomainError> {
        let entry = OutboxEntry::from_notification(notification)?;
        self.messages.lock().unwrap().push(OutboxMessage {
            id: Uuid::new_v4(),
            aggregate_type: entry.aggregate_type,
            aggregate_id: entry.aggregate_id,
            event_type: entry.event_type,
            payload: entry.payload,
            attempts: 0,
            created_at: Utc::now(),
        });
        Ok(())
    }

    pub fn event_types(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.event_type.clone())
            .collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.event_types().iter().filter(|t| *t == event_type).count()
    }

    pub fn attempts(&self, id: Uuid) -> i32 {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.attempts)
            .unwrap_or_default()
    }

    pub fn is_dispatched(&self, id: Uuid) -> bool {
        self.dispatched.lock().unwrap().contains(&id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.messages.lock().unwrap().iter().map(|m| m.id).collect()
    }
}

impl OutboxRepository for InMemoryOutbox {
    fn enqueue(&self, notification: &Notification) -> Result<(), DomainError> {
        self.push(notification)
    }

    fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>, DomainError> {
        let dispatched = self.dispatched.lock().unwrap();
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !dispatched.contains(&m.id) && m.attempts < max_attempts)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn mark_dispatched(&self, id: Uuid) -> Result<(), DomainError> {
        self.dispatched.lock().unwrap().insert(id);
        Ok(())
    }

    fn record_failure(&self, id: Uuid, _error: &str) -> Result<(), DomainError> {
        if let Some(m) = self.messages.lock().unwrap().iter_mut().find(|m| m.id == id) {
            m.attempts += 1;
        }
        Ok(())
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

pub struct InMemoryOrders {
    rows: Mutex<Vec<Order>>,
    outbox: Arc<InMemoryOutbox>,
    history: Mutex<Vec<HistoryEntry>>,
    /// When set, the next conditional update behaves as if it lost a race.
    lose_next_race: AtomicBool,
    pub fail_inserts: AtomicBool,
}

impl InMemoryOrders {
    pub fn new(outbox: Arc<InMemoryOutbox>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            outbox,
            history: Mutex::new(Vec::new()),
            lose_next_race: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
        }
    }

    pub fn get(&self, id: Uuid) -> Order {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .expect("order exists")
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().unwrap().clone()
    }

    pub fn lose_next_race(&self) {
        self.lose_next_race.store(true, Ordering::SeqCst);
    }

    /// Overwrites lifecycle fields directly, bypassing every rule.
    pub fn force(&self, id: Uuid, status: OrderStatus, payment_status: PaymentStatus) {
        let mut rows = self.rows.lock().unwrap();
        let order = rows.iter_mut().find(|o| o.id == id).expect("order exists");
        order.status = status;
        order.payment_status = payment_status;
    }
}

impl OrderRepository for InMemoryOrders {
    fn create(&self, new: NewOrder, notifications: &[Notification]) -> Result<Order, DomainError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("insert failed".to_string()));
        }
        let now = Utc::now();
        let order = Order {
            id: new.id,
            email: new.email,
            phone: new.phone,
            key_type: new.key_type,
            key_subtype: new.key_subtype,
            quantity: new.quantity,
            photo_urls: new.photo_urls,
            requires_verification: new.requires_verification,
            verification_status: VerificationStatus::Pending,
            verification_photo_url: new.verification_photo_url,
            delivery_method: new.delivery_method,
            delivery_address: new.delivery_address,
            subtotal_cents: new.quote.subtotal_cents,
            gst_cents: new.quote.gst_cents,
            delivery_cents: new.quote.delivery_cents,
            total_cents: new.quote.total_cents,
            payment_intent_ref: Some(new.payment_intent_ref),
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Received,
            tracking_token: new.tracking_token,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };
        for n in notifications {
            self.outbox.push(n)?;
        }
        self.rows.lock().unwrap().push(order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.tracking_token == token)
            .cloned())
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.payment_intent_ref.as_deref() == Some(intent_id))
            .cloned())
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| ids.contains(&o.id))
            .cloned()
            .collect())
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError> {
        let mut rows: Vec<Order> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.email == email)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Order>, DomainError> {
        let rows = self.rows.lock().unwrap();
        let items = rows
            .iter()
            .rev()
            .skip((page.max(1) - 1).saturating_mul(limit.max(0)) as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ListResult {
            items,
            total: rows.len() as i64,
        })
    }

    fn all(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderState,
        next: OrderState,
        extras: &OrderExtras,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Order>, DomainError> {
        if self.lose_next_race.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(order) = rows.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if order.state() != expected {
            return Ok(None);
        }
        self.history.lock().unwrap().push(HistoryEntry {
            entity_id: id,
            from_status: order.status.to_string(),
            to_status: next.status.to_string(),
            audit: audit.clone(),
        });
        order.status = next.status;
        order.payment_status = next.payment_status;
        order.verification_status = next.verification_status;
        if let Some(number) = &extras.tracking_number {
            order.tracking_number = Some(number.clone());
        }
        order.updated_at = Utc::now();
        for n in notifications {
            self.outbox.push(n)?;
        }
        Ok(Some(order.clone()))
    }
}

// ── Bookings ─────────────────────────────────────────────────────────────────

pub struct InMemoryBookings {
    rows: Mutex<Vec<Booking>>,
    outbox: Arc<InMemoryOutbox>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryBookings {
    pub fn new(outbox: Arc<InMemoryOutbox>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            outbox,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, id: Uuid) -> Booking {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .expect("booking exists")
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().unwrap().clone()
    }
}

impl BookingRepository for InMemoryBookings {
    fn create(&self, new: NewBooking, notifications: &[Notification]) -> Result<Booking, DomainError> {
        let now = Utc::now();
        let booking = Booking {
            id: new.id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            service_type: new.service_type,
            service_description: new.service_description,
            urgency: new.urgency,
            service_address: new.service_address,
            access_instructions: new.access_instructions,
            preferred_date: new.preferred_date,
            preferred_time_slot: new.preferred_time_slot,
            service_price_cents: new.quote.service_price_cents,
            callout_fee_cents: new.quote.callout_fee_cents,
            estimated_total_cents: new.quote.subtotal_cents,
            gst_cents: new.quote.gst_cents,
            total_cents: new.quote.total_cents,
            payment_intent_ref: Some(new.payment_intent_ref),
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Pending,
            assignment: None,
            tracking_token: new.tracking_token,
            created_at: now,
            updated_at: now,
        };
        for n in notifications {
            self.outbox.push(n)?;
        }
        self.rows.lock().unwrap().push(booking.clone());
        Ok(booking)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Booking>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.tracking_token == token)
            .cloned())
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Booking>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.payment_intent_ref.as_deref() == Some(intent_id))
            .cloned())
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Booking>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<Booking>, DomainError> {
        let mut rows: Vec<Booking> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.email == email)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Booking>, DomainError> {
        let rows = self.rows.lock().unwrap();
        let items = rows
            .iter()
            .rev()
            .skip((page.max(1) - 1).saturating_mul(limit.max(0)) as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ListResult {
            items,
            total: rows.len() as i64,
        })
    }

    fn all(&self) -> Result<Vec<Booking>, DomainError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn transition(
        &self,
        id: Uuid,
        expected: BookingState,
        next: BookingState,
        assignment: Option<&Assignment>,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Booking>, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(booking) = rows.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if booking.state() != expected {
            return Ok(None);
        }
        self.history.lock().unwrap().push(HistoryEntry {
            entity_id: id,
            from_status: booking.status.to_string(),
            to_status: next.status.to_string(),
            audit: audit.clone(),
        });
        booking.status = next.status;
        booking.payment_status = next.payment_status;
        if let Some(assignment) = assignment {
            booking.assignment = Some(assignment.clone());
        }
        booking.updated_at = Utc::now();
        for n in notifications {
            self.outbox.push(n)?;
        }
        Ok(Some(booking.clone()))
    }
}

// ── Saved addresses ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAddresses {
    rows: Mutex<Vec<SavedAddress>>,
}

impl SavedAddressRepository for InMemoryAddresses {
    fn list_by_email(&self, email: &str) -> Result<Vec<SavedAddress>, DomainError> {
        let mut rows: Vec<SavedAddress> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.email == email)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (!a.is_default, a.created_at));
        Ok(rows)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<SavedAddress>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    fn create(&self, new: NewSavedAddress) -> Result<SavedAddress, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if new.is_default {
            for row in rows.iter_mut().filter(|a| a.email == new.email) {
                row.is_default = false;
            }
        }
        let now = Utc::now();
        let saved = SavedAddress {
            id: Uuid::new_v4(),
            email: new.email,
            label: new.label,
            address: new.address,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
        };
        rows.push(saved.clone());
        Ok(saved)
    }

    fn update(&self, id: Uuid, patch: SavedAddressPatch) -> Result<Option<SavedAddress>, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(email) = rows.iter().find(|a| a.id == id).map(|a| a.email.clone()) else {
            return Ok(None);
        };
        if patch.is_default == Some(true) {
            for row in rows.iter_mut().filter(|a| a.email == email && a.id != id) {
                row.is_default = false;
            }
        }
        let row = rows.iter_mut().find(|a| a.id == id).expect("row exists");
        if let Some(label) = patch.label {
            row.label = label;
        }
        if let Some(address) = patch.address {
            row.address = address;
        }
        if let Some(is_default) = patch.is_default {
            row.is_default = is_default;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() != before)
    }
}

// ── External collaborators ───────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeGateway {
    counter: AtomicUsize,
    pub fail: AtomicBool,
    pub requests: Mutex<Vec<IntentRequest>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl PaymentGateway for FakeGateway {
    fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Upstream("payment processor unavailable".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret"),
        })
    }

    fn cancel_intent(&self, intent_id: &str) -> Result<(), DomainError> {
        self.cancelled.lock().unwrap().push(intent_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

impl EmailSender for FakeMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Upstream("mail provider unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
