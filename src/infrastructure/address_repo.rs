use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::address::{NewSavedAddress, SavedAddress, SavedAddressPatch};
use crate::domain::errors::DomainError;
use crate::domain::ports::SavedAddressRepository;
use crate::schema::saved_addresses;

use super::models::{to_json, NewSavedAddressRow, SavedAddressChanges, SavedAddressRow};

/// Drops the default flag from every other address of `email`.
fn clear_default(conn: &mut PgConnection, email: &str, keep: Uuid) -> Result<(), DomainError> {
    diesel::update(
        saved_addresses::table
            .filter(saved_addresses::email.eq(email))
            .filter(saved_addresses::id.ne(keep))
            .filter(saved_addresses::is_default.eq(true)),
    )
    .set((
        saved_addresses::is_default.eq(false),
        saved_addresses::updated_at.eq(Utc::now()),
    ))
    .execute(conn)?;
    Ok(())
}

pub struct DieselSavedAddressRepository {
    pool: DbPool,
}

impl DieselSavedAddressRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SavedAddressRepository for DieselSavedAddressRepository {
    fn list_by_email(&self, email: &str) -> Result<Vec<SavedAddress>, DomainError> {
        let mut conn = self.pool.get()?;
        saved_addresses::table
            .filter(saved_addresses::email.eq(email))
            .order((saved_addresses::is_default.desc(), saved_addresses::created_at.asc()))
            .select(SavedAddressRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(SavedAddress::try_from)
            .collect()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<SavedAddress>, DomainError> {
        let mut conn = self.pool.get()?;
        saved_addresses::table
            .find(id)
            .select(SavedAddressRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(SavedAddress::try_from)
            .transpose()
    }

    fn create(&self, address: NewSavedAddress) -> Result<SavedAddress, DomainError> {
        let mut conn = self.pool.get()?;
        let row = NewSavedAddressRow {
            id: Uuid::new_v4(),
            email: address.email,
            label: address.label,
            address: to_json(&address.address)?,
            is_default: address.is_default,
        };

        conn.transaction::<_, DomainError, _>(|conn| {
            if row.is_default {
                clear_default(conn, &row.email, row.id)?;
            }
            let inserted = diesel::insert_into(saved_addresses::table)
                .values(&row)
                .returning(SavedAddressRow::as_returning())
                .get_result(conn)?;
            SavedAddress::try_from(inserted)
        })
    }

    fn update(&self, id: Uuid, patch: SavedAddressPatch) -> Result<Option<SavedAddress>, DomainError> {
        let mut conn = self.pool.get()?;
        let changes = SavedAddressChanges {
            label: patch.label,
            address: patch.address.as_ref().map(to_json).transpose()?,
            is_default: patch.is_default,
            updated_at: Utc::now(),
        };

        conn.transaction::<_, DomainError, _>(|conn| {
            let owner = saved_addresses::table
                .find(id)
                .select(saved_addresses::email)
                .for_update()
                .first::<String>(conn)
                .optional()?;
            let Some(email) = owner else {
                return Ok(None);
            };
            // The partial unique index allows one default per email at any moment.
            if changes.is_default == Some(true) {
                clear_default(conn, &email, id)?;
            }

            let row = diesel::update(saved_addresses::table.find(id))
                .set(&changes)
                .returning(SavedAddressRow::as_returning())
                .get_result(conn)?;
            SavedAddress::try_from(row).map(Some)
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(saved_addresses::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
