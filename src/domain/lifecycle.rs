//! Legal status transitions for orders and bookings.
//!
//! Every function here is pure: it inspects the current state and returns
//! the next one, or an [`InvalidTransition`] naming the rule that blocked it.
//! Persisting the result is the caller's job and must be a conditional
//! update against the state that was inspected.

use std::fmt;

use serde::Deserialize;
use utoipa::ToSchema;

use super::booking::{BookingState, BookingStatus};
use super::entity::EntityKind;
use super::errors::InvalidTransition;
use super::order::{Order, OrderState, OrderStatus, VerificationStatus};
use super::payment::PaymentStatus;

pub const ORDER_FINAL: &str = "delivered and cancelled orders are final";
pub const ORDER_CANCEL_WINDOW: &str = "orders can only be cancelled while received or verified";
pub const ORDER_PAID_CANCEL: &str = "cannot cancel order after payment; an administrator must cancel it";
pub const ORDER_ONE_STEP: &str =
    "orders move one step at a time: received, verified, cutting, shipped, delivered";
pub const VERIFICATION_GATE: &str = "restricted keys must be approved before cutting";
pub const VERIFICATION_NOT_REQUIRED: &str = "order does not require verification";
pub const VERIFICATION_DECIDED: &str = "verification has already been decided";
pub const VERIFICATION_TOO_LATE: &str = "verification cannot change once cutting has started";
pub const BOOKING_FINAL: &str = "completed and cancelled bookings are final";
pub const BOOKING_ONE_STEP: &str =
    "bookings move one step at a time: pending, confirmed, assigned, in_progress, completed";
pub const BOOKING_ASSIGN: &str = "a locksmith can only be assigned to a confirmed booking";

/// Who caused a transition, recorded in the status history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Customer,
    PaymentProcessor,
    Admin(String),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Customer => f.write_str("customer"),
            Actor::PaymentProcessor => f.write_str("payment_processor"),
            Actor::Admin(email) => write!(f, "admin:{email}"),
        }
    }
}

/// Audit context written alongside a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    pub actor: Actor,
    pub note: String,
}

impl Audit {
    pub fn new(actor: Actor, note: impl Into<String>) -> Self {
        Self {
            actor,
            note: note.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDecision {
    Approve,
    Reject,
}

/// Result of an administrative override: the new state, plus the strict
/// rule the override stepped over, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override<S> {
    pub next: S,
    pub bypassed: Option<InvalidTransition>,
}

fn order_denied(current: OrderStatus, attempted: OrderStatus, rule: &'static str) -> InvalidTransition {
    InvalidTransition {
        entity: EntityKind::Order,
        current: current.to_string(),
        attempted: attempted.to_string(),
        rule,
    }
}

fn booking_denied(current: BookingStatus, attempted: BookingStatus, rule: &'static str) -> InvalidTransition {
    InvalidTransition {
        entity: EntityKind::Booking,
        current: current.to_string(),
        attempted: attempted.to_string(),
        rule,
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

fn check_verification_gate(
    state: &OrderState,
    requires_verification: bool,
    to: OrderStatus,
) -> Result<(), InvalidTransition> {
    if requires_verification
        && to.needs_cleared_verification()
        && state.verification_status != VerificationStatus::Approved
    {
        return Err(order_denied(state.status, to, VERIFICATION_GATE));
    }
    Ok(())
}

/// The strict transition table.
pub fn check_order_step(
    state: &OrderState,
    requires_verification: bool,
    to: OrderStatus,
) -> Result<(), InvalidTransition> {
    if state.status.is_terminal() {
        return Err(order_denied(state.status, to, ORDER_FINAL));
    }
    if to == OrderStatus::Cancelled {
        return match state.status {
            OrderStatus::Received | OrderStatus::Verified => Ok(()),
            _ => Err(order_denied(state.status, to, ORDER_CANCEL_WINDOW)),
        };
    }
    if state.status.next() != Some(to) {
        return Err(order_denied(state.status, to, ORDER_ONE_STEP));
    }
    check_verification_gate(state, requires_verification, to)
}

/// Self-service cancellation. Paid orders need an administrator.
pub fn customer_cancel_order(state: &OrderState) -> Result<OrderState, InvalidTransition> {
    let to = OrderStatus::Cancelled;
    if state.status.is_terminal() {
        return Err(order_denied(state.status, to, ORDER_FINAL));
    }
    if !matches!(state.status, OrderStatus::Received | OrderStatus::Verified) {
        return Err(order_denied(state.status, to, ORDER_CANCEL_WINDOW));
    }
    if state.payment_status == PaymentStatus::Paid {
        return Err(order_denied(state.status, to, ORDER_PAID_CANCEL));
    }
    Ok(OrderState {
        status: to,
        ..*state
    })
}

/// `None` when the payment was already recorded, so replays change nothing.
pub fn order_payment_succeeded(order: &Order) -> Option<OrderState> {
    let state = order.state();
    if matches!(state.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded) {
        return None;
    }
    let status = match state.status {
        OrderStatus::Received | OrderStatus::Verified if !order.verification_pending() => {
            state.status.next().unwrap_or(state.status)
        }
        other => other,
    };
    Some(OrderState {
        status,
        payment_status: PaymentStatus::Paid,
        verification_status: state.verification_status,
    })
}

/// Marks a pending charge failed. A late failure never downgrades a
/// settled payment.
pub fn order_payment_failed(state: &OrderState) -> Option<OrderState> {
    match state.payment_status {
        PaymentStatus::Pending => Some(OrderState {
            payment_status: PaymentStatus::Failed,
            ..*state
        }),
        PaymentStatus::Failed | PaymentStatus::Paid | PaymentStatus::Refunded => None,
    }
}

pub fn decide_verification(
    order: &Order,
    decision: VerificationDecision,
) -> Result<OrderState, InvalidTransition> {
    let state = order.state();
    let to = match decision {
        VerificationDecision::Approve => OrderStatus::Verified,
        VerificationDecision::Reject => OrderStatus::Cancelled,
    };
    if !order.requires_verification {
        return Err(order_denied(state.status, to, VERIFICATION_NOT_REQUIRED));
    }
    if state.status.is_terminal() {
        return Err(order_denied(state.status, to, ORDER_FINAL));
    }
    if state.verification_status != VerificationStatus::Pending {
        return Err(order_denied(state.status, to, VERIFICATION_DECIDED));
    }
    if !matches!(state.status, OrderStatus::Received | OrderStatus::Verified) {
        return Err(order_denied(state.status, to, VERIFICATION_TOO_LATE));
    }
    Ok(match decision {
        VerificationDecision::Approve => OrderState {
            status: OrderStatus::Verified,
            verification_status: VerificationStatus::Approved,
            ..state
        },
        VerificationDecision::Reject => OrderState {
            status: OrderStatus::Cancelled,
            verification_status: VerificationStatus::Rejected,
            ..state
        },
    })
}

/// Administrative status change. Ignores the strict table but never lets a
/// restricted key past verification without approval.
pub fn admin_override_order(
    order: &Order,
    to: OrderStatus,
) -> Result<Override<OrderState>, InvalidTransition> {
    let state = order.state();
    check_verification_gate(&state, order.requires_verification, to)?;
    let bypassed = if state.status == to {
        None
    } else {
        check_order_step(&state, order.requires_verification, to).err()
    };
    Ok(Override {
        next: OrderState { status: to, ..state },
        bypassed,
    })
}

// ── Bookings ─────────────────────────────────────────────────────────────────

pub fn check_booking_step(state: &BookingState, to: BookingStatus) -> Result<(), InvalidTransition> {
    if state.status.is_terminal() {
        return Err(booking_denied(state.status, to, BOOKING_FINAL));
    }
    if to == BookingStatus::Cancelled || state.status.next() == Some(to) {
        Ok(())
    } else {
        Err(booking_denied(state.status, to, BOOKING_ONE_STEP))
    }
}

pub fn customer_cancel_booking(state: &BookingState) -> Result<BookingState, InvalidTransition> {
    check_booking_step(state, BookingStatus::Cancelled)?;
    Ok(BookingState {
        status: BookingStatus::Cancelled,
        ..*state
    })
}

pub fn booking_payment_succeeded(state: &BookingState) -> Option<BookingState> {
    if matches!(state.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded) {
        return None;
    }
    let status = match state.status {
        BookingStatus::Pending => BookingStatus::Confirmed,
        other => other,
    };
    Some(BookingState {
        status,
        payment_status: PaymentStatus::Paid,
    })
}

pub fn booking_payment_failed(state: &BookingState) -> Option<BookingState> {
    match state.payment_status {
        PaymentStatus::Pending => Some(BookingState {
            payment_status: PaymentStatus::Failed,
            ..*state
        }),
        PaymentStatus::Failed | PaymentStatus::Paid | PaymentStatus::Refunded => None,
    }
}

/// Confirmed bookings become assigned; assigned ones may be reassigned.
pub fn assign_booking(state: &BookingState) -> Result<BookingState, InvalidTransition> {
    match state.status {
        BookingStatus::Confirmed | BookingStatus::Assigned => Ok(BookingState {
            status: BookingStatus::Assigned,
            ..*state
        }),
        status if status.is_terminal() => Err(booking_denied(status, BookingStatus::Assigned, BOOKING_FINAL)),
        status => Err(booking_denied(status, BookingStatus::Assigned, BOOKING_ASSIGN)),
    }
}

pub fn admin_override_booking(state: &BookingState, to: BookingStatus) -> Override<BookingState> {
    let bypassed = if state.status == to {
        None
    } else {
        check_booking_step(state, to).err()
    };
    Override {
        next: BookingState { status: to, ..*state },
        bypassed,
    }
}
