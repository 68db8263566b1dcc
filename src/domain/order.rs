use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::address::Address;
use super::errors::FieldErrors;
use super::payment::PaymentStatus;
use super::pricing::{self, OrderQuote};
use super::validation::{sanitize, validate_optional_au_phone, validate_optional_photo_url, validate_photo_urls};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyType {
    Standard,
    Restricted,
    Car,
    Specialty,
}

impl KeyType {
    /// Restricted keys need proof of ownership before they are cut.
    pub fn requires_verification(self) -> bool {
        matches!(self, KeyType::Restricted)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMethod {
    Standard,
    Express,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Verified,
    Cutting,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The next step on the fulfilment path, if any.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Received => Some(OrderStatus::Verified),
            OrderStatus::Verified => Some(OrderStatus::Cutting),
            OrderStatus::Cutting => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Statuses that can only be reached once a restricted key is approved.
    pub fn needs_cleared_verification(self) -> bool {
        matches!(
            self,
            OrderStatus::Cutting | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// The mutable lifecycle fields of an order. Conditional updates compare
/// all three before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub key_type: KeyType,
    pub key_subtype: Option<String>,
    pub quantity: i32,
    pub photo_urls: Vec<String>,
    pub requires_verification: bool,
    pub verification_status: VerificationStatus,
    pub verification_photo_url: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: Address,
    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub delivery_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub tracking_token: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn state(&self) -> OrderState {
        OrderState {
            status: self.status,
            payment_status: self.payment_status,
            verification_status: self.verification_status,
        }
    }

    /// True while a restricted key still waits for an admin decision.
    pub fn verification_pending(&self) -> bool {
        self.requires_verification && self.verification_status == VerificationStatus::Pending
    }

    pub fn quote(&self) -> OrderQuote {
        OrderQuote {
            subtotal_cents: self.subtotal_cents,
            delivery_cents: self.delivery_cents,
            gst_cents: self.gst_cents,
            total_cents: self.total_cents,
        }
    }
}

/// What the customer submits for a key-copy order. Money fields are
/// optional echoes of what the form displayed; when present they must match
/// the server-side price.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct OrderRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Please enter a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(custom = "validate_optional_au_phone")]
    pub phone: Option<String>,
    pub key_type: KeyType,
    #[serde(default)]
    #[validate(length(max = 100, message = "Key brand/model is too long"))]
    pub key_subtype: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    pub quantity: i32,
    #[validate(
        length(min = 1, message = "At least one key photo is required"),
        custom = "validate_photo_urls"
    )]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    #[validate(custom = "validate_optional_photo_url")]
    pub verification_photo_url: Option<String>,
    pub delivery_method: DeliveryMethod,
    #[validate]
    pub delivery_address: Address,
    #[serde(default)]
    pub subtotal_cents: Option<i64>,
    #[serde(default)]
    pub gst_cents: Option<i64>,
    #[serde(default)]
    pub delivery_cents: Option<i64>,
    #[serde(default)]
    pub total_cents: Option<i64>,
}

/// A validated order ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub key_type: KeyType,
    pub key_subtype: Option<String>,
    pub quantity: i32,
    pub photo_urls: Vec<String>,
    pub requires_verification: bool,
    pub verification_photo_url: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: Address,
    pub quote: OrderQuote,
    pub payment_intent_ref: String,
    pub tracking_token: String,
}

impl OrderRequest {
    /// Checks every field, recomputes the price and reports all problems at once.
    pub fn checked_quote(&self) -> Result<OrderQuote, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        let has_proof = self
            .verification_photo_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        if self.key_type.requires_verification() && !has_proof {
            errors.add(
                "verification_photo_url",
                "Proof of ownership is required for restricted keys",
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let quote = pricing::order_total(self.key_type, self.quantity, self.delivery_method);
        quote.check_submitted(
            self.subtotal_cents,
            self.delivery_cents,
            self.gst_cents,
            self.total_cents,
        )?;
        Ok(quote)
    }

    /// Builds the persisted form once the payment intent exists.
    pub fn into_new_order(
        self,
        id: Uuid,
        quote: OrderQuote,
        payment_intent_ref: String,
        tracking_token: String,
    ) -> NewOrder {
        NewOrder {
            id,
            email: self.email.trim().to_lowercase(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            requires_verification: self.key_type.requires_verification(),
            key_type: self.key_type,
            key_subtype: self
                .key_subtype
                .as_deref()
                .map(sanitize)
                .filter(|s| !s.is_empty()),
            quantity: self.quantity,
            photo_urls: self.photo_urls,
            verification_photo_url: self.verification_photo_url.filter(|u| !u.trim().is_empty()),
            delivery_method: self.delivery_method,
            delivery_address: self.delivery_address.sanitized(),
            quote,
            payment_intent_ref,
            tracking_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn request(key_type: KeyType) -> OrderRequest {
        OrderRequest {
            email: "Jane@Example.com".to_string(),
            phone: Some("0412 345 678".to_string()),
            key_type,
            key_subtype: Some("Lockwood 001".to_string()),
            quantity: 2,
            photo_urls: vec!["https://files.example.com/key-front.jpg".to_string()],
            verification_photo_url: None,
            delivery_method: DeliveryMethod::Standard,
            delivery_address: Address {
                street: "12 King Street".to_string(),
                unit: None,
                suburb: "Newtown".to_string(),
                state: "NSW".to_string(),
                postcode: "2042".to_string(),
            },
            subtotal_cents: None,
            gst_cents: None,
            delivery_cents: None,
            total_cents: None,
        }
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(OrderStatus::Cutting.as_ref(), "cutting");
        assert_eq!(
            OrderStatus::from_str("delivered").unwrap(),
            OrderStatus::Delivered
        );
        assert!(OrderStatus::from_str("processing").is_err());
    }

    #[test]
    fn only_restricted_keys_need_verification() {
        assert!(KeyType::Restricted.requires_verification());
        assert!(!KeyType::Car.requires_verification());
    }

    #[test]
    fn valid_request_yields_server_quote() {
        let quote = request(KeyType::Standard).checked_quote().expect("valid");
        assert_eq!(quote.total_cents, 4180);
    }

    #[test]
    fn restricted_key_without_proof_is_rejected() {
        let errors = request(KeyType::Restricted).checked_quote().unwrap_err();
        assert_eq!(
            errors.get("verification_photo_url"),
            Some("Proof of ownership is required for restricted keys")
        );
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        let mut req = request(KeyType::Standard);
        req.quantity = 11;
        assert_eq!(
            req.checked_quote().unwrap_err().get("quantity"),
            Some("Quantity must be between 1 and 10")
        );
        req.quantity = 0;
        assert!(req.checked_quote().unwrap_err().contains("quantity"));
    }

    #[test]
    fn tampered_total_is_rejected() {
        let mut req = request(KeyType::Standard);
        req.total_cents = Some(100);
        let errors = req.checked_quote().unwrap_err();
        assert!(errors.contains("total_cents"));
    }

    #[test]
    fn matching_submitted_total_is_accepted() {
        let mut req = request(KeyType::Standard);
        req.subtotal_cents = Some(3000);
        req.delivery_cents = Some(800);
        req.gst_cents = Some(380);
        req.total_cents = Some(4180);
        assert!(req.checked_quote().is_ok());
    }

    #[test]
    fn into_new_order_normalises_contact_details() {
        let req = request(KeyType::Standard);
        let quote = req.checked_quote().unwrap();
        let new = req.into_new_order(Uuid::new_v4(), quote, "pi_1".into(), "KC-ABC".into());
        assert_eq!(new.email, "jane@example.com");
        assert!(!new.requires_verification);
        assert_eq!(new.payment_intent_ref, "pi_1");
    }

    #[test]
    fn malformed_email_and_photo_urls_are_reported() {
        let mut req = request(KeyType::Standard);
        req.email = String::new();
        req.photo_urls = vec!["file:///tmp/key.jpg".to_string()];
        let errors = req.checked_quote().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("photo_urls"), Some("Invalid photo URL"));
    }

    #[test]
    fn blank_optional_phone_is_ignored() {
        let mut req = request(KeyType::Standard);
        req.phone = Some("  ".to_string());
        assert!(req.checked_quote().is_ok());
        req.phone = Some("555-1234".to_string());
        assert!(req.checked_quote().unwrap_err().contains("phone"));
    }

    #[test]
    fn nested_address_errors_are_prefixed() {
        let mut req = request(KeyType::Standard);
        req.delivery_address.postcode = "abc".to_string();
        let errors = req.checked_quote().unwrap_err();
        assert!(errors.contains("delivery_address.postcode"));
    }
}
