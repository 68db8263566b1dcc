use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;
use super::notification::Notification;

/// A queued notification as stored in the outbox table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    pub fn notification(&self) -> Result<Notification, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::Internal(format!("outbox message {} has a bad payload: {e}", self.id))
        })
    }
}

/// Column values for a new outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

impl OutboxEntry {
    pub fn from_notification(notification: &Notification) -> Result<Self, DomainError> {
        let (aggregate_type, aggregate_id) = match notification.aggregate() {
            Some((kind, id)) => (kind.to_string(), id.to_string()),
            None => ("contact".to_string(), Uuid::new_v4().to_string()),
        };
        let payload = serde_json::to_value(notification)
            .map_err(|e| DomainError::Internal(format!("cannot encode notification: {e}")))?;
        Ok(Self {
            aggregate_type,
            aggregate_id,
            event_type: notification.event_type().to_string(),
            payload,
        })
    }
}
