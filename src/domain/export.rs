//! CSV export of selected orders or bookings.

use chrono::{DateTime, FixedOffset, Utc};

use super::address::Address;
use super::entity::{Entity, EntityKind};
use super::errors::DomainError;
use super::pricing::format_cents;

pub const ORDER_COLUMNS: [&str; 21] = [
    "id",
    "email",
    "phone",
    "key_type",
    "key_subtype",
    "quantity",
    "delivery_method",
    "delivery_address_street",
    "delivery_address_unit",
    "delivery_address_suburb",
    "delivery_address_state",
    "delivery_address_postcode",
    "subtotal",
    "gst",
    "delivery",
    "total",
    "status",
    "payment_status",
    "created_at",
    "updated_at",
    "tracking_token",
];

pub const BOOKING_COLUMNS: [&str; 22] = [
    "id",
    "email",
    "phone",
    "service_type",
    "service_description",
    "urgency",
    "service_address_street",
    "service_address_unit",
    "service_address_suburb",
    "service_address_state",
    "service_address_postcode",
    "preferred_date",
    "preferred_time_slot",
    "callout_fee",
    "estimated_total",
    "total",
    "gst",
    "status",
    "payment_status",
    "created_at",
    "updated_at",
    "tracking_token",
];

pub fn columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Order => &ORDER_COLUMNS,
        EntityKind::Booking => &BOOKING_COLUMNS,
    }
}

fn address_cells(address: &Address) -> [String; 5] {
    [
        address.street.clone(),
        address.unit.clone().unwrap_or_default(),
        address.suburb.clone(),
        address.state.clone(),
        address.postcode.clone(),
    ]
}

fn timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d/%m/%Y %H:%M:%S").to_string()
}

/// One row of display values, in [`columns`] order.
pub fn record(entity: &Entity, offset: FixedOffset) -> Vec<String> {
    match entity {
        Entity::Order(o) => {
            let mut row = vec![
                o.id.to_string(),
                o.email.clone(),
                o.phone.clone().unwrap_or_default(),
                o.key_type.to_string(),
                o.key_subtype.clone().unwrap_or_default(),
                o.quantity.to_string(),
                o.delivery_method.to_string(),
            ];
            row.extend(address_cells(&o.delivery_address));
            row.extend([
                format_cents(o.subtotal_cents),
                format_cents(o.gst_cents),
                format_cents(o.delivery_cents),
                format_cents(o.total_cents),
                o.status.to_string(),
                o.payment_status.to_string(),
                timestamp(o.created_at, offset),
                timestamp(o.updated_at, offset),
                o.tracking_token.clone(),
            ]);
            row
        }
        Entity::Booking(b) => {
            let mut row = vec![
                b.id.to_string(),
                b.email.clone(),
                b.phone.clone(),
                b.service_type.to_string(),
                b.service_description.clone().unwrap_or_default(),
                b.urgency.to_string(),
            ];
            row.extend(address_cells(&b.service_address));
            row.extend([
                b.preferred_date.format("%d/%m/%Y").to_string(),
                b.preferred_time_slot.clone(),
                format_cents(b.callout_fee_cents),
                format_cents(b.estimated_total_cents),
                format_cents(b.total_cents),
                format_cents(b.gst_cents),
                b.status.to_string(),
                b.payment_status.to_string(),
                timestamp(b.created_at, offset),
                timestamp(b.updated_at, offset),
                b.tracking_token.clone(),
            ]);
            row
        }
    }
}

/// Quotes a cell when it holds a comma, quote or line break; inner quotes
/// are doubled.
pub fn escape_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Header plus one line per entity. Every entity must be of `kind`.
pub fn render_csv(kind: EntityKind, entities: &[Entity], offset: FixedOffset) -> Result<String, DomainError> {
    let mut lines = Vec::with_capacity(entities.len() + 1);
    lines.push(columns(kind).join(","));
    for entity in entities {
        if entity.kind() != kind {
            return Err(DomainError::Internal(format!(
                "cannot export {} {} as {kind}",
                entity.kind(),
                entity.id()
            )));
        }
        let cells: Vec<String> = record(entity, offset)
            .iter()
            .map(|cell| escape_cell(cell))
            .collect();
        lines.push(cells.join(","));
    }
    Ok(lines.join("\n"))
}
