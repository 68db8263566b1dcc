use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::domain::address::{Address, NewSavedAddress, SavedAddress, SavedAddressPatch};
use crate::domain::errors::DomainError;
use crate::domain::ports::SavedAddressRepository;
use crate::domain::validation::sanitize;

/// Saved addresses for the signed-in customer. Another customer's address
/// is indistinguishable from a missing one.
pub struct AddressService {
    repo: Arc<dyn SavedAddressRepository>,
}

impl AddressService {
    pub fn new(repo: Arc<dyn SavedAddressRepository>) -> Self {
        Self { repo }
    }

    pub fn list(&self, email: &str) -> Result<Vec<SavedAddress>, DomainError> {
        self.repo.list_by_email(&email.to_lowercase())
    }

    pub fn create(
        &self,
        email: &str,
        label: &str,
        address: Address,
        is_default: bool,
    ) -> Result<SavedAddress, DomainError> {
        let new = NewSavedAddress {
            email: email.to_lowercase(),
            label: label.to_string(),
            address,
            is_default,
        };
        new.validate()?;

        let saved = self.repo.create(NewSavedAddress {
            label: sanitize(&new.label),
            address: new.address.sanitized(),
            ..new
        })?;
        log::info!("Saved address {} created for {}", saved.id, saved.email);
        Ok(saved)
    }

    pub fn update(&self, email: &str, id: Uuid, patch: SavedAddressPatch) -> Result<SavedAddress, DomainError> {
        if patch.is_empty() {
            return Err(DomainError::validation("body", "Nothing to update"));
        }
        patch.validate()?;

        self.owned(email, id)?;
        let patch = SavedAddressPatch {
            label: patch.label.as_deref().map(sanitize),
            address: patch.address.as_ref().map(Address::sanitized),
            is_default: patch.is_default,
        };
        self.repo.update(id, patch)?.ok_or(DomainError::NotFound)
    }

    pub fn delete(&self, email: &str, id: Uuid) -> Result<(), DomainError> {
        self.owned(email, id)?;
        if self.repo.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }

    fn owned(&self, email: &str, id: Uuid) -> Result<SavedAddress, DomainError> {
        self.repo
            .find_by_id(id)?
            .filter(|a| a.email.eq_ignore_ascii_case(email))
            .ok_or(DomainError::NotFound)
    }
}
