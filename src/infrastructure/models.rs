use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::address::{Address, SavedAddress};
use crate::domain::booking::{Assignment, Booking, NewBooking};
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order};
use crate::domain::outbox::{OutboxEntry, OutboxMessage};
use crate::schema::{bookings, notification_outbox, orders, saved_addresses, status_history};

// ── Column decoding ──────────────────────────────────────────────────────────

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, DomainError> {
    T::from_str(value).map_err(|_| DomainError::Internal(format!("unexpected {column} '{value}' in database")))
}

fn from_json<T: DeserializeOwned>(column: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| DomainError::Internal(format!("bad {column} in database: {e}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub key_type: String,
    pub key_subtype: Option<String>,
    pub quantity: i32,
    pub photo_urls: Vec<String>,
    pub requires_verification: bool,
    pub verification_status: String,
    pub verification_photo_url: Option<String>,
    pub delivery_method: String,
    pub delivery_address: Value,
    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub delivery_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub payment_status: String,
    pub status: String,
    pub tracking_token: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            email: row.email,
            phone: row.phone,
            key_type: parse_column("key_type", &row.key_type)?,
            key_subtype: row.key_subtype,
            quantity: row.quantity,
            photo_urls: row.photo_urls,
            requires_verification: row.requires_verification,
            verification_status: parse_column("verification_status", &row.verification_status)?,
            verification_photo_url: row.verification_photo_url,
            delivery_method: parse_column("delivery_method", &row.delivery_method)?,
            delivery_address: from_json("delivery_address", row.delivery_address)?,
            subtotal_cents: row.subtotal_cents,
            gst_cents: row.gst_cents,
            delivery_cents: row.delivery_cents,
            total_cents: row.total_cents,
            payment_intent_ref: row.payment_intent_ref,
            payment_status: parse_column("payment_status", &row.payment_status)?,
            status: parse_column("status", &row.status)?,
            tracking_token: row.tracking_token,
            tracking_number: row.tracking_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub key_type: String,
    pub key_subtype: Option<String>,
    pub quantity: i32,
    pub photo_urls: Vec<String>,
    pub requires_verification: bool,
    pub verification_photo_url: Option<String>,
    pub delivery_method: String,
    pub delivery_address: Value,
    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub delivery_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub tracking_token: String,
}

impl TryFrom<NewOrder> for NewOrderRow {
    type Error = DomainError;

    fn try_from(o: NewOrder) -> Result<Self, Self::Error> {
        Ok(NewOrderRow {
            id: o.id,
            email: o.email,
            phone: o.phone,
            key_type: o.key_type.to_string(),
            key_subtype: o.key_subtype,
            quantity: o.quantity,
            photo_urls: o.photo_urls,
            requires_verification: o.requires_verification,
            verification_photo_url: o.verification_photo_url,
            delivery_method: o.delivery_method.to_string(),
            delivery_address: to_json(&o.delivery_address)?,
            subtotal_cents: o.quote.subtotal_cents,
            gst_cents: o.quote.gst_cents,
            delivery_cents: o.quote.delivery_cents,
            total_cents: o.quote.total_cents,
            payment_intent_ref: Some(o.payment_intent_ref),
            tracking_token: o.tracking_token,
        })
    }
}

/// Lifecycle columns written by a conditional update. A `None` tracking
/// number leaves the stored value alone.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderStateChanges {
    pub status: String,
    pub payment_status: String,
    pub verification_status: String,
    pub tracking_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// As [`OrderStateChanges`]; a `None` assignment keeps the current one.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct BookingStateChanges {
    pub status: String,
    pub payment_status: String,
    pub assignment: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

/// Partial saved-address update.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = saved_addresses)]
pub struct SavedAddressChanges {
    pub label: Option<String>,
    pub address: Option<Value>,
    pub is_default: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

// ── Bookings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: String,
    pub service_description: Option<String>,
    pub urgency: String,
    pub service_address: Value,
    pub access_instructions: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub service_price_cents: i64,
    pub callout_fee_cents: i64,
    pub estimated_total_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub payment_status: String,
    pub status: String,
    pub assignment: Option<Value>,
    pub tracking_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DomainError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            service_type: parse_column("service_type", &row.service_type)?,
            service_description: row.service_description,
            urgency: parse_column("urgency", &row.urgency)?,
            service_address: from_json("service_address", row.service_address)?,
            access_instructions: row.access_instructions,
            preferred_date: row.preferred_date,
            preferred_time_slot: row.preferred_time_slot,
            service_price_cents: row.service_price_cents,
            callout_fee_cents: row.callout_fee_cents,
            estimated_total_cents: row.estimated_total_cents,
            gst_cents: row.gst_cents,
            total_cents: row.total_cents,
            payment_intent_ref: row.payment_intent_ref,
            payment_status: parse_column("payment_status", &row.payment_status)?,
            status: parse_column("status", &row.status)?,
            assignment: row
                .assignment
                .map(|a| from_json::<Assignment>("assignment", a))
                .transpose()?,
            tracking_token: row.tracking_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: String,
    pub service_description: Option<String>,
    pub urgency: String,
    pub service_address: Value,
    pub access_instructions: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub service_price_cents: i64,
    pub callout_fee_cents: i64,
    pub estimated_total_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub tracking_token: String,
}

impl TryFrom<NewBooking> for NewBookingRow {
    type Error = DomainError;

    fn try_from(b: NewBooking) -> Result<Self, Self::Error> {
        Ok(NewBookingRow {
            id: b.id,
            name: b.name,
            email: b.email,
            phone: b.phone,
            service_type: b.service_type.to_string(),
            service_description: b.service_description,
            urgency: b.urgency.to_string(),
            service_address: to_json(&b.service_address)?,
            access_instructions: b.access_instructions,
            preferred_date: b.preferred_date,
            preferred_time_slot: b.preferred_time_slot,
            service_price_cents: b.quote.service_price_cents,
            callout_fee_cents: b.quote.callout_fee_cents,
            estimated_total_cents: b.quote.subtotal_cents,
            gst_cents: b.quote.gst_cents,
            total_cents: b.quote.total_cents,
            payment_intent_ref: Some(b.payment_intent_ref),
            tracking_token: b.tracking_token,
        })
    }
}

// ── Saved addresses ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = saved_addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SavedAddressRow {
    pub id: Uuid,
    pub email: String,
    pub label: String,
    pub address: Value,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SavedAddressRow> for SavedAddress {
    type Error = DomainError;

    fn try_from(row: SavedAddressRow) -> Result<Self, Self::Error> {
        Ok(SavedAddress {
            id: row.id,
            email: row.email,
            label: row.label,
            address: from_json::<Address>("address", row.address)?,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = saved_addresses)]
pub struct NewSavedAddressRow {
    pub id: Uuid,
    pub email: String,
    pub label: String,
    pub address: Value,
    pub is_default: bool,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = notification_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEventRow> for OutboxMessage {
    fn from(row: OutboxEventRow) -> Self {
        OutboxMessage {
            id: row.id,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            attempts: row.attempts,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notification_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

impl From<OutboxEntry> for NewOutboxEventRow {
    fn from(entry: OutboxEntry) -> Self {
        NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: entry.aggregate_type,
            aggregate_id: entry.aggregate_id,
            event_type: entry.event_type,
            payload: entry.payload,
        }
    }
}

// ── Status history ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub from_payment_status: String,
    pub to_payment_status: String,
    pub actor: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = status_history)]
pub struct NewStatusHistoryRow {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub from_payment_status: String,
    pub to_payment_status: String,
    pub actor: String,
    pub note: String,
}
