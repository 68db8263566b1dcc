use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::booking::Booking;
use super::order::Order;
use super::payment::PaymentStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Order,
    Booking,
}

impl EntityKind {
    /// Public tracking tokens carry a per-kind prefix so a token can never
    /// name both an order and a booking.
    pub fn token_prefix(self) -> &'static str {
        match self {
            EntityKind::Order => "KC",
            EntityKind::Booking => "LS",
        }
    }
}

/// Either aggregate, for paths that handle both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Entity {
    Order(Order),
    Booking(Booking),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Order(_) => EntityKind::Order,
            Entity::Booking(_) => EntityKind::Booking,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Entity::Order(o) => o.id,
            Entity::Booking(b) => b.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Entity::Order(o) => &o.email,
            Entity::Booking(b) => &b.email,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Entity::Order(o) => o.status.as_ref(),
            Entity::Booking(b) => b.status.as_ref(),
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Entity::Order(o) => o.payment_status,
            Entity::Booking(b) => b.payment_status,
        }
    }

    pub fn total_cents(&self) -> i64 {
        match self {
            Entity::Order(o) => o.total_cents,
            Entity::Booking(b) => b.total_cents,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Entity::Order(o) => o.created_at,
            Entity::Booking(b) => b.created_at,
        }
    }
}

/// Generates a public tracking token such as `KC-7H2Q9MXA4D`.
pub fn new_tracking_token(kind: EntityKind) -> String {
    use rand::Rng;

    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let body: String = (0..10)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", kind.token_prefix(), body)
}

/// Which kind of entity a tracking token refers to, if it has a known prefix.
pub fn kind_of_token(token: &str) -> Option<EntityKind> {
    let (prefix, _) = token.split_once('-')?;
    [EntityKind::Order, EntityKind::Booking]
        .into_iter()
        .find(|kind| prefix.eq_ignore_ascii_case(kind.token_prefix()))
}
