use std::sync::Arc;

use uuid::Uuid;

use crate::domain::booking::BookingStatus;
use crate::domain::entity::{Entity, EntityKind};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{
    booking_payment_failed, booking_payment_succeeded, order_payment_failed, order_payment_succeeded, Actor, Audit,
};
use crate::domain::notification::Notification;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentEvent, ReconcileOutcome};
use crate::domain::ports::{BookingRepository, OrderExtras, OrderRepository, WebhookVerifier};

/// Re-reads after a lost conditional update before giving up.
const MAX_RECONCILE_ATTEMPTS: usize = 3;

/// Applies authenticated payment-processor events to orders and bookings.
pub struct PaymentBridge {
    orders: Arc<dyn OrderRepository>,
    bookings: Arc<dyn BookingRepository>,
    verifier: Arc<dyn WebhookVerifier>,
}

impl PaymentBridge {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        bookings: Arc<dyn BookingRepository>,
        verifier: Arc<dyn WebhookVerifier>,
    ) -> Self {
        Self {
            orders,
            bookings,
            verifier,
        }
    }

    /// Verifies the signature before touching any record. Replays of an
    /// already-applied event change nothing.
    pub fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<ReconcileOutcome, DomainError> {
        let event = self.verifier.verify(payload, signature)?;
        match event {
            PaymentEvent::Succeeded { intent_id } => self.reconcile(&intent_id, true),
            PaymentEvent::Failed { intent_id } => self.reconcile(&intent_id, false),
            PaymentEvent::Ignored { event_type } => {
                log::info!("Unhandled payment event type: {event_type}");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    /// Orders are checked before bookings.
    fn resolve(&self, intent_id: &str) -> Result<Option<Entity>, DomainError> {
        if let Some(order) = self.orders.find_by_payment_intent(intent_id)? {
            return Ok(Some(Entity::Order(order)));
        }
        Ok(self.bookings.find_by_payment_intent(intent_id)?.map(Entity::Booking))
    }

    fn reconcile(&self, intent_id: &str, succeeded: bool) -> Result<ReconcileOutcome, DomainError> {
        let audit = Audit::new(
            Actor::PaymentProcessor,
            if succeeded { "payment succeeded" } else { "payment failed" },
        );
        for _ in 0..MAX_RECONCILE_ATTEMPTS {
            let Some(entity) = self.resolve(intent_id)? else {
                log::warn!("No order or booking found for payment intent {intent_id}");
                return Ok(ReconcileOutcome::UnknownIntent);
            };
            let (kind, id) = (entity.kind(), entity.id());

            let written = match entity {
                Entity::Order(order) => {
                    let next = if succeeded {
                        order_payment_succeeded(&order)
                    } else {
                        order_payment_failed(&order.state())
                    };
                    let Some(next) = next else {
                        return Ok(already_applied(kind, id, intent_id));
                    };
                    let notifications = match (succeeded, order.status) {
                        (true, OrderStatus::Cancelled) => {
                            log::warn!("Payment received for cancelled order {id}; refund it manually");
                            vec![]
                        }
                        (true, _) => vec![Notification::order_confirmed(&order)],
                        (false, _) => vec![],
                    };
                    self.orders
                        .transition(id, order.state(), next, &OrderExtras::default(), &audit, &notifications)?
                        .is_some()
                }
                Entity::Booking(booking) => {
                    let next = if succeeded {
                        booking_payment_succeeded(&booking.state())
                    } else {
                        booking_payment_failed(&booking.state())
                    };
                    let Some(next) = next else {
                        return Ok(already_applied(kind, id, intent_id));
                    };
                    let notifications = match (succeeded, booking.status) {
                        (true, BookingStatus::Cancelled) => {
                            log::warn!("Payment received for cancelled booking {id}; refund it manually");
                            vec![]
                        }
                        (true, _) => vec![Notification::booking_confirmed(&booking)],
                        (false, _) => vec![],
                    };
                    self.bookings
                        .transition(id, booking.state(), next, None, &audit, &notifications)?
                        .is_some()
                }
            };

            if written {
                if succeeded {
                    log::info!("{kind} {id} payment confirmed");
                } else {
                    log::warn!("{kind} {id} payment failed");
                }
                return Ok(ReconcileOutcome::Applied { entity: kind, id });
            }
            log::debug!("{kind} {id} changed while applying payment event; retrying");
        }
        Err(DomainError::Conflict(format!(
            "record for payment intent {intent_id} kept changing"
        )))
    }
}

fn already_applied(entity: EntityKind, id: Uuid, intent_id: &str) -> ReconcileOutcome {
    log::info!("Payment event for intent {intent_id} already applied to {entity} {id}");
    ReconcileOutcome::AlreadyApplied { entity, id }
}
