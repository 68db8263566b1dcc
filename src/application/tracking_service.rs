use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::booking::{Booking, ServiceType};
use crate::domain::entity::{kind_of_token, Entity, EntityKind};
use crate::domain::errors::DomainError;
use crate::domain::order::{DeliveryMethod, KeyType, Order, VerificationStatus};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{BookingRepository, OrderRepository};

/// What an unauthenticated visitor may see about an order or booking.
/// Contact details and addresses are left out.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackingView {
    pub kind: EntityKind,
    pub id: Uuid,
    pub tracking_token: String,
    pub status: String,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderProgress {
    pub key_type: KeyType,
    pub quantity: i32,
    pub delivery_method: DeliveryMethod,
    pub requires_verification: bool,
    pub verification_status: VerificationStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookingProgress {
    pub service_type: ServiceType,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub locksmith_name: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
}

impl From<&Order> for TrackingView {
    fn from(o: &Order) -> Self {
        Self {
            kind: EntityKind::Order,
            id: o.id,
            tracking_token: o.tracking_token.clone(),
            status: o.status.to_string(),
            payment_status: o.payment_status,
            total_cents: o.total_cents,
            created_at: o.created_at,
            updated_at: o.updated_at,
            order: Some(OrderProgress {
                key_type: o.key_type,
                quantity: o.quantity,
                delivery_method: o.delivery_method,
                requires_verification: o.requires_verification,
                verification_status: o.verification_status,
                tracking_number: o.tracking_number.clone(),
            }),
            booking: None,
        }
    }
}

impl From<&Booking> for TrackingView {
    fn from(b: &Booking) -> Self {
        Self {
            kind: EntityKind::Booking,
            id: b.id,
            tracking_token: b.tracking_token.clone(),
            status: b.status.to_string(),
            payment_status: b.payment_status,
            total_cents: b.total_cents,
            created_at: b.created_at,
            updated_at: b.updated_at,
            order: None,
            booking: Some(BookingProgress {
                service_type: b.service_type,
                preferred_date: b.preferred_date,
                preferred_time_slot: b.preferred_time_slot.clone(),
                locksmith_name: b.assignment.as_ref().map(|a| a.locksmith_name.clone()),
                estimated_arrival: b.assignment.as_ref().and_then(|a| a.estimated_arrival),
            }),
        }
    }
}

impl From<&Entity> for TrackingView {
    fn from(entity: &Entity) -> Self {
        match entity {
            Entity::Order(o) => o.into(),
            Entity::Booking(b) => b.into(),
        }
    }
}

/// Everything a signed-in customer has placed, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerHistory {
    pub orders: Vec<Order>,
    pub bookings: Vec<Booking>,
}

pub struct TrackingService {
    orders: Arc<dyn OrderRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl TrackingService {
    pub fn new(orders: Arc<dyn OrderRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { orders, bookings }
    }

    /// Resolves a record id or tracking token. Ids are tried against orders
    /// first; tokens go straight to the kind their prefix names.
    pub fn lookup(&self, query: &str) -> Result<Entity, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::validation("query", "Query parameter required"));
        }

        if let Ok(id) = Uuid::parse_str(query) {
            if let Some(order) = self.orders.find_by_id(id)? {
                return Ok(Entity::Order(order));
            }
            return self
                .bookings
                .find_by_id(id)?
                .map(Entity::Booking)
                .ok_or(DomainError::NotFound);
        }

        let token = query.to_uppercase();
        let found = match kind_of_token(&token) {
            Some(EntityKind::Order) => self.orders.find_by_tracking_token(&token)?.map(Entity::Order),
            Some(EntityKind::Booking) => self
                .bookings
                .find_by_tracking_token(&token)?
                .map(Entity::Booking),
            None => None,
        };
        found.ok_or(DomainError::NotFound)
    }

    pub fn track(&self, query: &str) -> Result<TrackingView, DomainError> {
        self.lookup(query).map(|entity| TrackingView::from(&entity))
    }

    pub fn history_for(&self, email: &str) -> Result<CustomerHistory, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(CustomerHistory {
            orders: self.orders.list_by_email(&email)?,
            bookings: self.bookings.list_by_email(&email)?,
        })
    }
}
