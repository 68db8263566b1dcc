use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::entity::EntityKind;
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::Audit;
use crate::domain::notification::Notification;
use crate::domain::outbox::{OutboxEntry, OutboxMessage};
use crate::domain::ports::OutboxRepository;
use crate::schema::{notification_outbox, status_history};

use super::models::{NewOutboxEventRow, NewStatusHistoryRow, OutboxEventRow};

/// Writes outbox rows on a connection that is already inside the caller's
/// transaction.
pub(crate) fn insert_notifications(conn: &mut PgConnection, notifications: &[Notification]) -> Result<(), DomainError> {
    if notifications.is_empty() {
        return Ok(());
    }
    let rows = notifications
        .iter()
        .map(|n| OutboxEntry::from_notification(n).map(NewOutboxEventRow::from))
        .collect::<Result<Vec<_>, _>>()?;
    diesel::insert_into(notification_outbox::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

/// One status-history row for a committed transition.
pub(crate) struct HistoryRecord<'a> {
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub from: (String, String),
    pub to: (String, String),
    pub audit: &'a Audit,
}

pub(crate) fn insert_history(conn: &mut PgConnection, record: HistoryRecord<'_>) -> Result<(), DomainError> {
    diesel::insert_into(status_history::table)
        .values(&NewStatusHistoryRow {
            id: Uuid::new_v4(),
            entity_type: record.entity.to_string(),
            entity_id: record.entity_id,
            from_status: record.from.0,
            to_status: record.to.0,
            from_payment_status: record.from.1,
            to_payment_status: record.to.1,
            actor: record.audit.actor.to_string(),
            note: record.audit.note.clone(),
        })
        .execute(conn)?;
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOutboxRepository {
    pool: DbPool,
}

impl DieselOutboxRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OutboxRepository for DieselOutboxRepository {
    fn enqueue(&self, notification: &Notification) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        insert_notifications(&mut conn, std::slice::from_ref(notification))
    }

    fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = notification_outbox::table
            .filter(notification_outbox::dispatched_at.is_null())
            .filter(notification_outbox::attempts.lt(max_attempts))
            .order(notification_outbox::created_at.asc())
            .limit(limit)
            .select(OutboxEventRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(OutboxMessage::from).collect())
    }

    fn mark_dispatched(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(notification_outbox::table.find(id))
            .set(notification_outbox::dispatched_at.eq(Some(Utc::now())))
            .execute(&mut conn)?;
        Ok(())
    }

    fn record_failure(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(notification_outbox::table.find(id))
            .set((
                notification_outbox::attempts.eq(notification_outbox::attempts + 1),
                notification_outbox::last_error.eq(Some(error)),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}
