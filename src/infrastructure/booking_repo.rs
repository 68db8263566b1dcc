use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::booking::{Assignment, Booking, BookingState, NewBooking};
use crate::domain::entity::EntityKind;
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::Audit;
use crate::domain::notification::Notification;
use crate::domain::ports::{BookingRepository, ListResult};
use crate::schema::bookings;

use super::models::{to_json, BookingRow, BookingStateChanges, NewBookingRow};
use super::outbox_repo::{insert_history, insert_notifications, HistoryRecord};

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, DomainError> {
    rows.into_iter().map(Booking::try_from).collect()
}

pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl BookingRepository for DieselBookingRepository {
    fn create(&self, booking: NewBooking, notifications: &[Notification]) -> Result<Booking, DomainError> {
        let mut conn = self.pool.get()?;
        let row = NewBookingRow::try_from(booking)?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let inserted = diesel::insert_into(bookings::table)
                .values(&row)
                .returning(BookingRow::as_returning())
                .get_result(conn)?;
            insert_notifications(conn, notifications)?;
            Booking::try_from(inserted)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        bookings::table
            .find(id)
            .select(BookingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    fn find_by_tracking_token(&self, token: &str) -> Result<Option<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        bookings::table
            .filter(bookings::tracking_token.eq(token))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        bookings::table
            .filter(bookings::payment_intent_ref.eq(intent_id))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = bookings::table
            .filter(bookings::id.eq_any(ids))
            .select(BookingRow::as_select())
            .load(&mut conn)?;
        into_bookings(rows)
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = bookings::table
            .filter(bookings::email.eq(email))
            .order(bookings::created_at.desc())
            .select(BookingRow::as_select())
            .load(&mut conn)?;
        into_bookings(rows)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult<Booking>, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page.max(1) - 1).saturating_mul(limit.max(0));
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = bookings::table.count().get_result(conn)?;
            let rows = bookings::table
                .select(BookingRow::as_select())
                .order(bookings::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;
            Ok(ListResult {
                items: into_bookings(rows)?,
                total,
            })
        })
    }

    fn all(&self) -> Result<Vec<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = bookings::table
            .order(bookings::created_at.asc())
            .select(BookingRow::as_select())
            .load(&mut conn)?;
        into_bookings(rows)
    }

    fn transition(
        &self,
        id: Uuid,
        expected: BookingState,
        next: BookingState,
        assignment: Option<&Assignment>,
        audit: &Audit,
        notifications: &[Notification],
    ) -> Result<Option<Booking>, DomainError> {
        let mut conn = self.pool.get()?;
        let assignment = assignment.map(to_json).transpose()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                bookings::table
                    .filter(bookings::id.eq(id))
                    .filter(bookings::status.eq(expected.status.to_string()))
                    .filter(bookings::payment_status.eq(expected.payment_status.to_string())),
            )
            .set(&BookingStateChanges {
                status: next.status.to_string(),
                payment_status: next.payment_status.to_string(),
                assignment,
                updated_at: Utc::now(),
            })
            .returning(BookingRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = updated else {
                return Ok(None);
            };

            insert_history(
                conn,
                HistoryRecord {
                    entity: EntityKind::Booking,
                    entity_id: id,
                    from: (expected.status.to_string(), expected.payment_status.to_string()),
                    to: (next.status.to_string(), next.payment_status.to_string()),
                    audit,
                },
            )?;
            insert_notifications(conn, notifications)?;

            Booking::try_from(row).map(Some)
        })
    }
}
