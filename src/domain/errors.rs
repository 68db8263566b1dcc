use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use super::entity::EntityKind;

/// Field-level validation messages keyed by the dotted field path,
/// e.g. `delivery_address.postcode`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{field}"),
                None => field.to_string(),
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    for error in list {
                        let message = match &error.message {
                            Some(message) => message.to_string(),
                            None => format!("Invalid value ({})", error.code),
                        };
                        self.add(path.clone(), message);
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(Some(&path), inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect(Some(&format!("{path}.{index}")), inner);
                    }
                }
            }
        }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

/// Flattens derive-validator output into dotted paths, e.g.
/// `delivery_address.postcode`.
impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        fields.collect(None, &errors);
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// A status change rejected by the lifecycle rules. Nothing is mutated when
/// this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move {entity} from '{current}' to '{attempted}': {rule}")]
pub struct InvalidTransition {
    pub entity: EntityKind,
    pub current: String,
    pub attempted: String,
    pub rule: &'static str,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The row changed between read and conditional write.
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Invalid webhook signature")]
    SignatureInvalid,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors.into())
    }
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(FieldErrors::single(field, message))
    }
}

#[cfg(test)]
mod tests {
    use validator::ValidationError;

    use super::*;

    #[test]
    fn first_message_per_field_is_kept() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        errors.add("email", "Please enter a valid email address");
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn validator_errors_are_flattened_into_dotted_paths() {
        let mut postcode = ValidationError::new("postcode");
        postcode.message = Some("Please enter a valid 4-digit postcode".into());
        let mut address = ValidationErrors::new();
        address.add("postcode", postcode);

        let mut errors = ValidationErrors::new();
        errors.add("quantity", ValidationError::new("range"));
        let errors = ValidationErrors::merge(Err(errors), "delivery_address", Err(address)).unwrap_err();

        let fields = FieldErrors::from(errors);
        assert_eq!(
            fields.get("delivery_address.postcode"),
            Some("Please enter a valid 4-digit postcode")
        );
        assert_eq!(fields.get("quantity"), Some("Invalid value (range)"));
    }

    #[test]
    fn validator_errors_become_a_validation_failure() {
        let mut errors = ValidationErrors::new();
        errors.add("quantity", ValidationError::new("range"));
        assert!(matches!(DomainError::from(errors), DomainError::Validation(f) if f.contains("quantity")));
    }

    #[test]
    fn invalid_transition_display_names_both_states() {
        let err = InvalidTransition {
            entity: EntityKind::Order,
            current: "shipped".to_string(),
            attempted: "cancelled".to_string(),
            rule: "orders can only be cancelled before cutting starts",
        };
        assert_eq!(
            err.to_string(),
            "cannot move order from 'shipped' to 'cancelled': orders can only be cancelled before cutting starts"
        );
    }
}
