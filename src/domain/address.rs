use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::validation::{sanitize, validate_not_blank, validate_postcode, validate_state};

/// Structured Australian street address, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct Address {
    #[validate(
        length(min = 3, max = 200, message = "Street address must be 3 to 200 characters"),
        custom = "validate_not_blank"
    )]
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20, message = "Unit is too long"))]
    pub unit: Option<String>,
    #[validate(
        length(min = 2, max = 100, message = "Suburb must be 2 to 100 characters"),
        custom = "validate_not_blank"
    )]
    pub suburb: String,
    #[validate(custom = "validate_state")]
    pub state: String,
    #[validate(custom = "validate_postcode")]
    pub postcode: String,
}

impl Address {
    pub fn sanitized(&self) -> Self {
        Self {
            street: sanitize(&self.street),
            unit: self
                .unit
                .as_deref()
                .map(sanitize)
                .filter(|u| !u.is_empty()),
            suburb: sanitize(&self.suburb),
            state: self.state.trim().to_uppercase(),
            postcode: self.postcode.trim().to_string(),
        }
    }

    /// Single-line rendering used in e-mails, e.g. `3/12 King St, Newtown NSW 2042`.
    pub fn one_line(&self) -> String {
        let street = match &self.unit {
            Some(unit) => format!("{unit}/{}", self.street),
            None => self.street.clone(),
        };
        format!("{street}, {} {} {}", self.suburb, self.state, self.postcode)
    }
}

/// An address a customer keeps for pre-filling future orders and bookings.
/// At most one per email is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SavedAddress {
    pub id: Uuid,
    pub email: String,
    pub label: String,
    pub address: Address,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate)]
pub struct NewSavedAddress {
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "Label must be 1 to 50 characters"), custom = "validate_not_blank")]
    pub label: String,
    #[validate]
    pub address: Address,
    pub is_default: bool,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct SavedAddressPatch {
    #[validate(length(min = 1, max = 50, message = "Label must be 1 to 50 characters"), custom = "validate_not_blank")]
    pub label: Option<String>,
    #[validate]
    pub address: Option<Address>,
    pub is_default: Option<bool>,
}

impl SavedAddressPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.address.is_none() && self.is_default.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FieldErrors;

    fn sydney() -> Address {
        Address {
            street: "12 King Street".to_string(),
            unit: Some("3".to_string()),
            suburb: "Newtown".to_string(),
            state: "NSW".to_string(),
            postcode: "2042".to_string(),
        }
    }

    #[test]
    fn valid_address_has_no_errors() {
        assert!(sydney().validate().is_ok());
    }

    #[test]
    fn reports_each_bad_component() {
        let address = Address {
            street: "1".to_string(),
            unit: None,
            suburb: "X".to_string(),
            state: "XYZ".to_string(),
            postcode: "20".to_string(),
        };
        let errors = FieldErrors::from(address.validate().unwrap_err());
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("postcode"), Some("Please enter a valid 4-digit postcode"));
        assert_eq!(errors.get("state"), Some("Please select a valid Australian state"));
    }

    #[test]
    fn sanitized_normalises_state_and_drops_blank_unit() {
        let mut address = sydney();
        address.state = " vic ".to_string();
        address.unit = Some("   ".to_string());
        let clean = address.sanitized();
        assert_eq!(clean.state, "VIC");
        assert_eq!(clean.unit, None);
    }

    #[test]
    fn whitespace_only_street_is_required() {
        let mut address = sydney();
        address.street = "    ".to_string();
        let errors = FieldErrors::from(address.validate().unwrap_err());
        assert_eq!(errors.get("street"), Some("This field is required"));
    }

    #[test]
    fn patch_checks_label_and_nested_address() {
        let mut address = sydney();
        address.postcode = "x".to_string();
        let patch = SavedAddressPatch {
            label: Some(String::new()),
            address: Some(address),
            is_default: None,
        };
        let errors = FieldErrors::from(patch.validate().unwrap_err());
        assert!(errors.contains("label"));
        assert!(errors.contains("address.postcode"));
    }

    #[test]
    fn one_line_includes_unit() {
        assert_eq!(sydney().one_line(), "3/12 King Street, Newtown NSW 2042");
    }
}
