use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use super::order_service::StatusChange;
use crate::domain::booking::{Assignment, Booking, BookingRequest, BookingStatus};
use crate::domain::entity::{new_tracking_token, EntityKind};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{admin_override_booking, assign_booking, customer_cancel_booking, Actor, Audit};
use crate::domain::notification::Notification;
use crate::domain::payment::IntentRequest;
use crate::domain::ports::{BookingRepository, ListResult, PaymentGateway};

#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub client_secret: String,
}

pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentGateway>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { repo, payments }
    }

    /// Same write-before-pay sequence as orders. `today` bounds the
    /// preferred date.
    pub fn create_booking(&self, request: BookingRequest, today: NaiveDate) -> Result<CreatedBooking, DomainError> {
        let validated = request.checked_quote(today).map_err(DomainError::Validation)?;
        let id = Uuid::new_v4();

        let intent = self.payments.create_intent(&IntentRequest {
            entity: EntityKind::Booking,
            entity_id: id,
            amount_cents: validated.quote.total_cents,
        })?;

        let new_booking = request.into_new_booking(
            id,
            validated,
            intent.id.clone(),
            new_tracking_token(EntityKind::Booking),
        );
        let alert = Notification::AdminNewBooking {
            booking_id: id,
            name: new_booking.name.clone(),
            email: new_booking.email.clone(),
            service_type: new_booking.service_type,
            urgency: new_booking.urgency,
            preferred_date: new_booking.preferred_date,
            preferred_time_slot: new_booking.preferred_time_slot.clone(),
            total_cents: new_booking.quote.total_cents,
        };

        match self.repo.create(new_booking, &[alert]) {
            Ok(booking) => {
                log::info!(
                    "Booking {} created ({} {}, {} {})",
                    booking.id,
                    booking.urgency,
                    booking.service_type,
                    booking.preferred_date,
                    booking.preferred_time_slot
                );
                Ok(CreatedBooking {
                    booking,
                    client_secret: intent.client_secret,
                })
            }
            Err(e) => {
                log::error!("Failed to store booking {id}: {e}");
                if let Err(cancel_err) = self.payments.cancel_intent(&intent.id) {
                    log::error!("Failed to cancel orphaned payment intent {}: {cancel_err}", intent.id);
                }
                Err(e)
            }
        }
    }

    pub fn get_booking(&self, id: Uuid) -> Result<Booking, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)
    }

    pub fn list_bookings(&self, page: i64, limit: i64) -> Result<ListResult<Booking>, DomainError> {
        self.repo.list(page, limit)
    }

    pub fn bookings_for_email(&self, email: &str) -> Result<Vec<Booking>, DomainError> {
        self.repo.list_by_email(&email.trim().to_lowercase())
    }

    pub fn cancel_booking(&self, id: Uuid, email: &str) -> Result<Booking, DomainError> {
        let booking = self.get_booking(id)?;
        if !booking.email.eq_ignore_ascii_case(email.trim()) {
            return Err(DomainError::NotFound);
        }
        let next = customer_cancel_booking(&booking.state())?;
        let notification = Notification::BookingCancelled {
            booking_id: booking.id,
            email: booking.email.clone(),
        };
        let cancelled = self
            .repo
            .transition(
                booking.id,
                booking.state(),
                next,
                None,
                &Audit::new(Actor::Customer, "cancelled by customer"),
                &[notification],
            )?
            .ok_or_else(|| DomainError::Conflict(format!("booking {id} changed while cancelling")))?;
        log::info!(target: "audit", "booking {id} cancelled by customer");
        Ok(cancelled)
    }

    /// Dispatches a locksmith. Reassigning an assigned booking replaces the
    /// locksmith and notifies the customer again.
    pub fn assign_locksmith(&self, id: Uuid, assignment: Assignment, admin: &str) -> Result<Booking, DomainError> {
        assignment.validate()?;
        let booking = self.get_booking(id)?;
        let next = assign_booking(&booking.state())?;
        let assignment = Assignment {
            locksmith_name: assignment.locksmith_name.trim().to_string(),
            locksmith_phone: assignment.locksmith_phone.trim().to_string(),
            ..assignment
        };
        let notification = Notification::BookingAssigned {
            booking_id: booking.id,
            email: booking.email.clone(),
            tracking_token: booking.tracking_token.clone(),
            locksmith_name: assignment.locksmith_name.clone(),
            locksmith_phone: assignment.locksmith_phone.clone(),
        };
        let updated = self
            .repo
            .transition(
                booking.id,
                booking.state(),
                next,
                Some(&assignment),
                &Audit::new(
                    Actor::Admin(admin.to_string()),
                    format!("assigned {}", assignment.locksmith_name),
                ),
                &[notification],
            )?
            .ok_or_else(|| DomainError::Conflict(format!("booking {id} changed while assigning")))?;
        log::info!(
            target: "audit",
            "admin {admin} assigned locksmith {} to booking {id}",
            assignment.locksmith_id
        );
        Ok(updated)
    }

    pub fn set_status(&self, id: Uuid, to: BookingStatus, admin: &str) -> Result<StatusChange<Booking>, DomainError> {
        let booking = self.get_booking(id)?;
        let over = admin_override_booking(&booking.state(), to);
        if over.next == booking.state() {
            return Ok(StatusChange {
                entity: booking,
                changed: false,
                bypassed_rule: None,
            });
        }

        let notifications = if to == BookingStatus::Cancelled {
            vec![Notification::BookingCancelled {
                booking_id: booking.id,
                email: booking.email.clone(),
            }]
        } else {
            Vec::new()
        };

        let bypassed_rule = over.bypassed.map(|b| b.rule.to_string());
        let note = match &bypassed_rule {
            Some(rule) => format!("override: {rule}"),
            None => "status update".to_string(),
        };
        if let Some(rule) = &bypassed_rule {
            log::warn!(
                target: "audit",
                "admin {admin} overrode booking {id}: {} -> {to} ({rule})",
                booking.status
            );
        }

        let updated = self
            .repo
            .transition(
                booking.id,
                booking.state(),
                over.next,
                None,
                &Audit::new(Actor::Admin(admin.to_string()), note),
                &notifications,
            )?
            .ok_or_else(|| DomainError::Conflict(format!("booking {id} changed while updating")))?;
        log::info!(target: "audit", "admin {admin} set booking {id} status {} -> {to}", booking.status);
        Ok(StatusChange {
            entity: updated,
            changed: true,
            bypassed_rule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::{BOOKING_ASSIGN, BOOKING_FINAL};
    use crate::domain::payment::PaymentStatus;
    use crate::testing::{assignment, booking_request, today, FakeGateway, InMemoryBookings, InMemoryOutbox};

    struct Fixture {
        outbox: Arc<InMemoryOutbox>,
        bookings: Arc<InMemoryBookings>,
        gateway: Arc<FakeGateway>,
        service: BookingService,
    }

    fn fixture() -> Fixture {
        let outbox = Arc::new(InMemoryOutbox::default());
        let bookings = Arc::new(InMemoryBookings::new(outbox.clone()));
        let gateway = Arc::new(FakeGateway::default());
        let service = BookingService::new(bookings.clone(), gateway.clone());
        Fixture {
            outbox,
            bookings,
            gateway,
            service,
        }
    }

    fn confirmed(f: &Fixture) -> Booking {
        let booking = f.service.create_booking(booking_request(), today()).unwrap().booking;
        f.service.set_status(booking.id, BookingStatus::Confirmed, "admin@keycut.com.au").unwrap();
        f.bookings.get(booking.id)
    }

    #[test]
    fn create_booking_charges_server_total() {
        let f = fixture();
        let created = f.service.create_booking(booking_request(), today()).unwrap();
        let booking = created.booking;
        assert_eq!(booking.estimated_total_cents, 24900);
        assert_eq!(booking.total_cents, 27390);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.tracking_token.starts_with("LS-"));
        assert_eq!(f.gateway.requests.lock().unwrap()[0].amount_cents, 27390);
        assert_eq!(f.outbox.event_types(), vec!["admin_new_booking"]);
    }

    #[test]
    fn past_date_is_a_validation_error() {
        let f = fixture();
        let mut req = booking_request();
        req.preferred_date = "2001-01-01".to_string();
        match f.service.create_booking(req, today()).unwrap_err() {
            DomainError::Validation(errors) => {
                assert_eq!(errors.get("preferred_date"), Some("Preferred date cannot be in the past"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn customer_cancel_notifies_once() {
        let f = fixture();
        let booking = f.service.create_booking(booking_request(), today()).unwrap().booking;
        let cancelled = f.service.cancel_booking(booking.id, "sam@example.com").unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(f.outbox.count("booking_cancelled"), 1);

        let err = f.service.cancel_booking(booking.id, "sam@example.com").unwrap_err();
        match err {
            DomainError::InvalidTransition(t) => assert_eq!(t.rule, BOOKING_FINAL),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.outbox.count("booking_cancelled"), 1);
    }

    #[test]
    fn assignment_requires_confirmed_booking() {
        let f = fixture();
        let booking = f.service.create_booking(booking_request(), today()).unwrap().booking;
        match f.service.assign_locksmith(booking.id, assignment(), "admin@keycut.com.au").unwrap_err() {
            DomainError::InvalidTransition(t) => assert_eq!(t.rule, BOOKING_ASSIGN),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn assigning_records_locksmith_and_notifies() {
        let f = fixture();
        let booking = confirmed(&f);
        let updated = f
            .service
            .assign_locksmith(booking.id, assignment(), "admin@keycut.com.au")
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Assigned);
        assert_eq!(updated.assignment.unwrap().locksmith_name, "Alex Smith");
        assert_eq!(f.outbox.count("booking_assigned"), 1);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn invalid_assignment_is_rejected_before_lookup() {
        let f = fixture();
        let mut bad = assignment();
        bad.locksmith_phone = "nope".to_string();
        let err = f.service.assign_locksmith(Uuid::new_v4(), bad, "admin@keycut.com.au").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn admin_cancel_sends_cancellation() {
        let f = fixture();
        let booking = confirmed(&f);
        let change = f
            .service
            .set_status(booking.id, BookingStatus::Cancelled, "admin@keycut.com.au")
            .unwrap();
        assert!(change.changed);
        assert!(change.bypassed_rule.is_none());
        assert_eq!(f.outbox.count("booking_cancelled"), 1);
    }

    #[test]
    fn reopening_a_completed_booking_is_an_override() {
        let f = fixture();
        let booking = confirmed(&f);
        f.service.set_status(booking.id, BookingStatus::Completed, "admin@keycut.com.au").unwrap();
        let change = f
            .service
            .set_status(booking.id, BookingStatus::Assigned, "admin@keycut.com.au")
            .unwrap();
        assert_eq!(change.bypassed_rule.as_deref(), Some(BOOKING_FINAL));
        assert_eq!(f.bookings.history().len(), 3);
    }
}
