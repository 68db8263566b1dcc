//! Price list and totals. Every amount is integer cents (AUD); conversion to
//! dollars happens only when formatting for display.

use serde::Serialize;
use utoipa::ToSchema;

use super::booking::{ServiceType, Urgency};
use super::errors::FieldErrors;
use super::order::{DeliveryMethod, KeyType};

pub const STANDARD_KEY_CENTS: i64 = 1500;
pub const RESTRICTED_KEY_CENTS: i64 = 3500;
pub const CAR_KEY_CENTS: i64 = 8000;
pub const SPECIALTY_KEY_CENTS: i64 = 5000;

pub const STANDARD_DELIVERY_CENTS: i64 = 800;
pub const EXPRESS_DELIVERY_CENTS: i64 = 2000;

pub const STANDARD_CALLOUT_CENTS: i64 = 9900;
pub const URGENT_CALLOUT_CENTS: i64 = 19900;

pub const LOCKOUT_SERVICE_CENTS: i64 = 15000;
pub const REKEY_SERVICE_CENTS: i64 = 12000;
pub const INSTALLATION_SERVICE_CENTS: i64 = 20000;
pub const REPAIR_SERVICE_CENTS: i64 = 10000;

pub fn key_unit_price(key_type: KeyType) -> i64 {
    match key_type {
        KeyType::Standard => STANDARD_KEY_CENTS,
        KeyType::Restricted => RESTRICTED_KEY_CENTS,
        KeyType::Car => CAR_KEY_CENTS,
        KeyType::Specialty => SPECIALTY_KEY_CENTS,
    }
}

pub fn delivery_fee(method: DeliveryMethod) -> i64 {
    match method {
        DeliveryMethod::Standard => STANDARD_DELIVERY_CENTS,
        DeliveryMethod::Express => EXPRESS_DELIVERY_CENTS,
    }
}

pub fn callout_fee(urgency: Urgency) -> i64 {
    match urgency {
        Urgency::Standard => STANDARD_CALLOUT_CENTS,
        Urgency::Urgent => URGENT_CALLOUT_CENTS,
    }
}

pub fn service_price(service: ServiceType) -> i64 {
    match service {
        ServiceType::Lockout => LOCKOUT_SERVICE_CENTS,
        ServiceType::Rekey => REKEY_SERVICE_CENTS,
        ServiceType::Installation => INSTALLATION_SERVICE_CENTS,
        ServiceType::Repair => REPAIR_SERVICE_CENTS,
    }
}

/// 10% GST, rounded half-up to the cent.
pub fn gst(amount_cents: i64) -> i64 {
    (amount_cents + 5).div_euclid(10)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderQuote {
    pub subtotal_cents: i64,
    pub delivery_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
}

impl OrderQuote {
    /// Holds for every quote produced by [`order_total`].
    pub fn is_consistent(&self) -> bool {
        self.gst_cents == gst(self.subtotal_cents + self.delivery_cents)
            && self.total_cents == self.subtotal_cents + self.delivery_cents + self.gst_cents
    }

    /// Compares amounts echoed by a client against this quote.
    pub fn check_submitted(
        &self,
        subtotal: Option<i64>,
        delivery: Option<i64>,
        gst: Option<i64>,
        total: Option<i64>,
    ) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        mismatch(&mut errors, "subtotal_cents", subtotal, self.subtotal_cents);
        mismatch(&mut errors, "delivery_cents", delivery, self.delivery_cents);
        mismatch(&mut errors, "gst_cents", gst, self.gst_cents);
        mismatch(&mut errors, "total_cents", total, self.total_cents);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BookingQuote {
    pub service_price_cents: i64,
    pub callout_fee_cents: i64,
    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
}

impl BookingQuote {
    pub fn is_consistent(&self) -> bool {
        self.subtotal_cents == self.service_price_cents + self.callout_fee_cents
            && self.gst_cents == gst(self.subtotal_cents)
            && self.total_cents == self.subtotal_cents + self.gst_cents
    }

    pub fn check_submitted(
        &self,
        service_price: Option<i64>,
        callout: Option<i64>,
        gst: Option<i64>,
        total: Option<i64>,
    ) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        mismatch(&mut errors, "service_price_cents", service_price, self.service_price_cents);
        mismatch(&mut errors, "callout_fee_cents", callout, self.callout_fee_cents);
        mismatch(&mut errors, "gst_cents", gst, self.gst_cents);
        mismatch(&mut errors, "total_cents", total, self.total_cents);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn mismatch(errors: &mut FieldErrors, field: &str, submitted: Option<i64>, expected: i64) {
    if submitted.is_some_and(|value| value != expected) {
        errors.add(field, format!("does not match the current price ({expected} cents)"));
    }
}

pub fn order_total(key_type: KeyType, quantity: i32, method: DeliveryMethod) -> OrderQuote {
    let subtotal = key_unit_price(key_type) * i64::from(quantity);
    let delivery = delivery_fee(method);
    let gst_cents = gst(subtotal + delivery);
    OrderQuote {
        subtotal_cents: subtotal,
        delivery_cents: delivery,
        gst_cents,
        total_cents: subtotal + delivery + gst_cents,
    }
}

pub fn booking_total(service_price_cents: i64, callout_fee_cents: i64) -> BookingQuote {
    let subtotal = service_price_cents + callout_fee_cents;
    let gst_cents = gst(subtotal);
    BookingQuote {
        service_price_cents,
        callout_fee_cents,
        subtotal_cents: subtotal,
        gst_cents,
        total_cents: subtotal + gst_cents,
    }
}

/// The one booking price scheme: per-service price plus urgency callout.
pub fn quote_booking(service: ServiceType, urgency: Urgency) -> BookingQuote {
    booking_total(service_price(service), callout_fee(urgency))
}

/// `4180` → `$41.80`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
