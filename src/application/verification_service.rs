use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{decide_verification, Actor, Audit, VerificationDecision};
use crate::domain::notification::Notification;
use crate::domain::order::Order;
use crate::domain::ports::{OrderExtras, OrderRepository};

/// Admin review of proof-of-ownership photos for restricted keys.
pub struct VerificationService {
    orders: Arc<dyn OrderRepository>,
}

impl VerificationService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub fn decide(&self, order_id: Uuid, decision: VerificationDecision, admin: &str) -> Result<Order, DomainError> {
        let order = self.orders.find_by_id(order_id)?.ok_or(DomainError::NotFound)?;
        let next = decide_verification(&order, decision)?;
        let (notification, note) = match decision {
            VerificationDecision::Approve => (
                Notification::OrderVerified {
                    order_id: order.id,
                    email: order.email.clone(),
                    tracking_token: order.tracking_token.clone(),
                },
                "verification approved",
            ),
            VerificationDecision::Reject => (
                Notification::OrderVerificationRejected {
                    order_id: order.id,
                    email: order.email.clone(),
                },
                "verification rejected",
            ),
        };

        let updated = self
            .orders
            .transition(
                order.id,
                order.state(),
                next,
                &OrderExtras::default(),
                &Audit::new(Actor::Admin(admin.to_string()), note),
                &[notification],
            )?
            .ok_or_else(|| DomainError::Conflict(format!("order {order_id} changed during verification")))?;
        log::info!(target: "audit", "admin {admin}: order {order_id} {note}");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::order_service::OrderService;
    use crate::domain::lifecycle::{VERIFICATION_DECIDED, VERIFICATION_NOT_REQUIRED};
    use crate::domain::order::{KeyType, OrderStatus, VerificationStatus};
    use crate::testing::{order_request, FakeGateway, InMemoryOrders, InMemoryOutbox};

    const ADMIN: &str = "admin@keycut.com.au";

    fn setup(key_type: KeyType) -> (Arc<InMemoryOutbox>, Arc<InMemoryOrders>, VerificationService, Order) {
        let outbox = Arc::new(InMemoryOutbox::default());
        let orders = Arc::new(InMemoryOrders::new(outbox.clone()));
        let order = OrderService::new(orders.clone(), Arc::new(FakeGateway::default()))
            .create_order(order_request(key_type))
            .unwrap()
            .order;
        let service = VerificationService::new(orders.clone());
        (outbox, orders, service, order)
    }

    #[test]
    fn approval_marks_order_verified() {
        let (outbox, _, service, order) = setup(KeyType::Restricted);
        let updated = service.decide(order.id, VerificationDecision::Approve, ADMIN).unwrap();
        assert_eq!(updated.status, OrderStatus::Verified);
        assert_eq!(updated.verification_status, VerificationStatus::Approved);
        assert_eq!(outbox.count("order_verified"), 1);
    }

    #[test]
    fn rejection_cancels_and_notifies_exactly_once() {
        let (outbox, orders, service, order) = setup(KeyType::Restricted);
        let updated = service.decide(order.id, VerificationDecision::Reject, ADMIN).unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert_eq!(updated.verification_status, VerificationStatus::Rejected);
        assert_eq!(outbox.count("order_verification_rejected"), 1);
        assert_eq!(outbox.count("order_verified"), 0);
        assert_eq!(orders.history().len(), 1);
    }

    #[test]
    fn second_decision_is_refused() {
        let (outbox, _, service, order) = setup(KeyType::Restricted);
        service.decide(order.id, VerificationDecision::Approve, ADMIN).unwrap();
        match service.decide(order.id, VerificationDecision::Reject, ADMIN).unwrap_err() {
            DomainError::InvalidTransition(t) => assert_eq!(t.rule, VERIFICATION_DECIDED),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(outbox.count("order_verification_rejected"), 0);
    }

    #[test]
    fn unrestricted_orders_have_nothing_to_verify() {
        let (_, _, service, order) = setup(KeyType::Standard);
        match service.decide(order.id, VerificationDecision::Approve, ADMIN).unwrap_err() {
            DomainError::InvalidTransition(t) => assert_eq!(t.rule, VERIFICATION_NOT_REQUIRED),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (_, _, service, _) = setup(KeyType::Restricted);
        let err = service.decide(Uuid::new_v4(), VerificationDecision::Approve, ADMIN).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }
}
