use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::entity::EntityKind;
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::Audit;
use crate::domain::notification::Notification;
use crate::domain::order::{NewOrder, Order, OrderState};
use crate::domain::ports::{ListResult, OrderExtras, OrderRepository};
use crate::schema::orders;

use super::models::{NewOrderRow, OrderRow, OrderStateChanges};
use super::outbox_repo::{insert_history, insert_notifications, HistoryRecord};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    rows.into_iter().map(Order::try_from).collect()
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder, notifications: &[Notification]) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let row = NewOrderRow::try_from(order)?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let inserted = diesel::insert_into(orders::table)
                .values(&row)
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // Outbox rows commit or roll back with the order.
            insert_notifications(conn, notifications)?;

            Order::try_from(inserted)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .filter(orders::tracking_token.eq(token))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .filter(orders::payment_intent_ref.eq(intent_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = orders::table
            .filter(orders::id.eq_any(ids))
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        into_orders(rows)
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = orders::table
            .filter(orders::email.eq(email))
            .order(orders::created_at.desc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        into_orders(rows)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page.max(1) - 1).saturating_mul(limit.max(0));
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: into_orders(rows)?,
                total,
            })
        })
    }

    fn all(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = orders::table
            .order(orders::created_at.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        into_orders(rows)
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderState,
        next: OrderState,
        extras: &OrderExtras,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Compare-and-set on every lifecycle column; zero rows means a
            // concurrent writer got there first.
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq(expected.status.to_string()))
                    .filter(orders::payment_status.eq(expected.payment_status.to_string()))
                    .filter(orders::verification_status.eq(expected.verification_status.to_string())),
            )
            .set(&OrderStateChanges {
                status: next.status.to_string(),
                payment_status: next.payment_status.to_string(),
                verification_status: next.verification_status.to_string(),
                tracking_number: extras.tracking_number.clone(),
                updated_at: Utc::now(),
            })
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = updated else {
                return Ok(None);
            };

            insert_history(
                conn,
                HistoryRecord {
                    entity: EntityKind::Order,
                    entity_id: id,
                    from: (expected.status.to_string(), expected.payment_status.to_string()),
                    to: (next.status.to_string(), next.payment_status.to_string()),
                    audit,
                },
            )?;
            insert_notifications(conn, notifications)?;

            Order::try_from(row).map(Some)
        })
    }
}
