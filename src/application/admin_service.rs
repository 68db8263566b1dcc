use std::str::FromStr;
use std::sync::Arc;

use chrono::FixedOffset;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::booking_service::BookingService;
use super::order_service::OrderService;
use crate::domain::booking::{BookingStatus, ServiceType, Urgency};
use crate::domain::entity::{Entity, EntityKind};
use crate::domain::errors::DomainError;
use crate::domain::export::render_csv;
use crate::domain::order::OrderStatus;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{BookingRepository, OrderRepository};

/// Upper bound on ids accepted by one bulk request.
pub const MAX_BULK_IDS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkSkip {
    pub id: Uuid,
    pub reason: String,
}

/// Per-item result of a bulk status update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkOutcome {
    pub updated: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    pub skipped: Vec<BulkSkip>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_orders: i64,
    pub total_bookings: i64,
    /// Sum of totals over paid orders and bookings.
    pub revenue_cents: i64,
    /// Orders not yet being cut.
    pub pending_orders: i64,
    pub pending_bookings: i64,
    pub awaiting_verification: i64,
    pub urgent_bookings: i64,
    pub lockouts: i64,
}

pub struct AdminService {
    orders: Arc<OrderService>,
    bookings: Arc<BookingService>,
    order_repo: Arc<dyn OrderRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    display_offset: FixedOffset,
}

impl AdminService {
    pub fn new(
        orders: Arc<OrderService>,
        bookings: Arc<BookingService>,
        order_repo: Arc<dyn OrderRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            orders,
            bookings,
            order_repo,
            booking_repo,
            display_offset,
        }
    }

    /// Applies one target status to many records. Each item succeeds or is
    /// skipped on its own; an unknown status fails the whole request before
    /// anything is written.
    pub fn bulk_update_status(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        status: &str,
        admin: &str,
    ) -> Result<BulkOutcome, DomainError> {
        if ids.is_empty() {
            return Err(DomainError::validation("ids", "Select at least one item"));
        }
        if ids.len() > MAX_BULK_IDS {
            return Err(DomainError::validation("ids", "Too many items selected"));
        }
        let target = BulkTarget::parse(kind, status)?;

        let mut outcome = BulkOutcome::default();
        let mut seen = Vec::with_capacity(ids.len());
        for &id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);

            let result = match target {
                BulkTarget::Order(to) => self.orders.set_status(id, to, None, admin).map(|c| c.changed),
                BulkTarget::Booking(to) => self.bookings.set_status(id, to, admin).map(|c| c.changed),
            };
            match result {
                Ok(true) => outcome.updated.push(id),
                Ok(false) => outcome.unchanged.push(id),
                Err(DomainError::NotFound) => outcome.skipped.push(BulkSkip {
                    id,
                    reason: "not found".to_string(),
                }),
                Err(DomainError::InvalidTransition(t)) => outcome.skipped.push(BulkSkip {
                    id,
                    reason: t.rule.to_string(),
                }),
                Err(DomainError::Conflict(msg)) => outcome.skipped.push(BulkSkip { id, reason: msg }),
                Err(e) => return Err(e),
            }
        }
        log::info!(
            target: "audit",
            "admin {admin} bulk-set {} {kind}(s) to {status}: {} updated, {} unchanged, {} skipped",
            seen.len(),
            outcome.updated.len(),
            outcome.unchanged.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    /// CSV for the selected records, oldest first. Unknown ids are left out.
    pub fn export_csv(&self, kind: EntityKind, ids: &[Uuid]) -> Result<String, DomainError> {
        let mut entities: Vec<Entity> = match kind {
            EntityKind::Order => self
                .order_repo
                .find_by_ids(ids)?
                .into_iter()
                .map(Entity::Order)
                .collect(),
            EntityKind::Booking => self
                .booking_repo
                .find_by_ids(ids)?
                .into_iter()
                .map(Entity::Booking)
                .collect(),
        };
        entities.sort_by_key(|e| (e.created_at(), e.id()));
        render_csv(kind, &entities, self.display_offset)
    }

    pub fn stats(&self) -> Result<AdminStats, DomainError> {
        let orders = self.order_repo.all()?;
        let bookings = self.booking_repo.all()?;

        let paid_orders: i64 = orders
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Paid)
            .map(|o| o.total_cents)
            .sum();
        let paid_bookings: i64 = bookings
            .iter()
            .filter(|b| b.payment_status == PaymentStatus::Paid)
            .map(|b| b.total_cents)
            .sum();

        Ok(AdminStats {
            total_orders: orders.len() as i64,
            total_bookings: bookings.len() as i64,
            revenue_cents: paid_orders + paid_bookings,
            pending_orders: orders
                .iter()
                .filter(|o| matches!(o.status, OrderStatus::Received | OrderStatus::Verified))
                .count() as i64,
            pending_bookings: bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Pending)
                .count() as i64,
            awaiting_verification: orders
                .iter()
                .filter(|o| o.verification_pending() && !o.status.is_terminal())
                .count() as i64,
            urgent_bookings: bookings
                .iter()
                .filter(|b| b.urgency == Urgency::Urgent && !b.status.is_terminal())
                .count() as i64,
            lockouts: bookings
                .iter()
                .filter(|b| b.service_type == ServiceType::Lockout)
                .count() as i64,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum BulkTarget {
    Order(OrderStatus),
    Booking(BookingStatus),
}

impl BulkTarget {
    fn parse(kind: EntityKind, status: &str) -> Result<Self, DomainError> {
        let status = status.trim();
        match kind {
            EntityKind::Order => OrderStatus::from_str(status)
                .map(BulkTarget::Order)
                .map_err(|_| DomainError::validation("status", "Invalid order status")),
            EntityKind::Booking => BookingStatus::from_str(status)
                .map(BulkTarget::Booking)
                .map_err(|_| DomainError::validation("status", "Invalid booking status")),
        }
    }
}
