use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::{new_tracking_token, EntityKind};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{admin_override_order, customer_cancel_order, Actor, Audit};
use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderRequest, OrderStatus};
use crate::domain::payment::{IntentRequest, PaymentIntent};
use crate::domain::ports::{ListResult, OrderExtras, OrderRepository, PaymentGateway};

/// A freshly created order plus the secret the browser needs to confirm
/// the charge.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub client_secret: String,
}

/// Result of an administrative status change.
#[derive(Debug, Clone)]
pub struct StatusChange<T> {
    pub entity: T,
    pub changed: bool,
    /// The strict rule the change stepped over, if it was an override.
    pub bypassed_rule: Option<String>,
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentGateway>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { repo, payments }
    }

    /// Validates, opens a payment intent keyed by the new order id, then
    /// inserts the order with its admin alert. A failed insert cancels the
    /// intent so no chargeable intent is left pointing at nothing.
    pub fn create_order(&self, request: OrderRequest) -> Result<CreatedOrder, DomainError> {
        let quote = request.checked_quote().map_err(DomainError::Validation)?;
        let id = Uuid::new_v4();

        let intent = self.payments.create_intent(&IntentRequest {
            entity: EntityKind::Order,
            entity_id: id,
            amount_cents: quote.total_cents,
        })?;
        let PaymentIntent { id: intent_id, client_secret } = intent;

        let new_order = request.into_new_order(id, quote, intent_id.clone(), new_tracking_token(EntityKind::Order));
        let alert = Notification::AdminNewOrder {
            order_id: id,
            email: new_order.email.clone(),
            key_type: new_order.key_type,
            quantity: new_order.quantity,
            total_cents: new_order.quote.total_cents,
            requires_verification: new_order.requires_verification,
        };

        match self.repo.create(new_order, &[alert]) {
            Ok(order) => {
                log::info!(
                    "Order {} created ({} x {}, total {} cents)",
                    order.id,
                    order.quantity,
                    order.key_type,
                    order.total_cents
                );
                Ok(CreatedOrder { order, client_secret })
            }
            Err(e) => {
                log::error!("Failed to store order {id}: {e}");
                if let Err(cancel_err) = self.payments.cancel_intent(&intent_id) {
                    log::error!("Failed to cancel orphaned payment intent {intent_id}: {cancel_err}");
                }
                Err(e)
            }
        }
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult<Order>, DomainError> {
        self.repo.list(page, limit)
    }

    pub fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, DomainError> {
        self.repo.list_by_email(&email.trim().to_lowercase())
    }

    /// Customer cancellation. An email that does not own the order is
    /// treated as if the order did not exist.
    pub fn cancel_order(&self, id: Uuid, email: &str) -> Result<Order, DomainError> {
        let order = self.get_order(id)?;
        if !order.email.eq_ignore_ascii_case(email.trim()) {
            return Err(DomainError::NotFound);
        }
        let next = customer_cancel_order(&order.state())?;
        let notification = Notification::OrderCancelled {
            order_id: order.id,
            email: order.email.clone(),
        };
        let cancelled = self
            .repo
            .transition(
                order.id,
                order.state(),
                next,
                &OrderExtras::default(),
                &Audit::new(Actor::Customer, "cancelled by customer"),
                &[notification],
            )?
            .ok_or_else(|| DomainError::Conflict(format!("order {id} changed while cancelling")))?;
        log::info!(target: "audit", "order {id} cancelled by customer");
        Ok(cancelled)
    }

    /// Administrative status change. Steps outside the normal flow are
    /// allowed and logged, except that restricted keys never pass
    /// verification unapproved.
    pub fn set_status(
        &self,
        id: Uuid,
        to: OrderStatus,
        tracking_number: Option<String>,
        admin: &str,
    ) -> Result<StatusChange<Order>, DomainError> {
        let order = self.get_order(id)?;
        let over = admin_override_order(&order, to)?;
        let tracking_number = tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if over.next == order.state() && tracking_number.is_none() {
            return Ok(StatusChange {
                entity: order,
                changed: false,
                bypassed_rule: None,
            });
        }

        let mut notifications = Vec::new();
        if to != order.status {
            match to {
                OrderStatus::Shipped => notifications.push(Notification::OrderShipped {
                    order_id: order.id,
                    email: order.email.clone(),
                    tracking_token: order.tracking_token.clone(),
                    tracking_number: tracking_number.clone().or_else(|| order.tracking_number.clone()),
                }),
                OrderStatus::Cancelled => notifications.push(Notification::OrderCancelled {
                    order_id: order.id,
                    email: order.email.clone(),
                }),
                _ => {}
            }
        }

        let bypassed_rule = over.bypassed.map(|b| b.rule.to_string());
        let note = match &bypassed_rule {
            Some(rule) => format!("override: {rule}"),
            None => "status update".to_string(),
        };
        if let Some(rule) = &bypassed_rule {
            log::warn!(
                target: "audit",
                "admin {admin} overrode order {id}: {} -> {to} ({rule})",
                order.status
            );
        }

        let updated = self
            .repo
            .transition(
                order.id,
                order.state(),
                over.next,
                &OrderExtras { tracking_number },
                &Audit::new(Actor::Admin(admin.to_string()), note),
                &notifications,
            )?
            .ok_or_else(|| DomainError::Conflict(format!("order {id} changed while updating")))?;
        log::info!(target: "audit", "admin {admin} set order {id} status {} -> {to}", order.status);
        Ok(StatusChange {
            entity: updated,
            changed: true,
            bypassed_rule,
        })
    }
}
