use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::entity::EntityKind;

pub const CURRENCY: &str = "aud";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// What the processor needs to open a charge for one order or booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// An authenticated notification from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Succeeded { intent_id: String },
    Failed { intent_id: String },
    Ignored { event_type: String },
}

/// How a notification was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { entity: EntityKind, id: Uuid },
    AlreadyApplied { entity: EntityKind, id: Uuid },
    UnknownIntent,
    Ignored,
}
