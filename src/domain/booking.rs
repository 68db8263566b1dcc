use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::address::Address;
use super::errors::FieldErrors;
use super::payment::PaymentStatus;
use super::pricing::{self, BookingQuote};
use super::validation::{sanitize, validate_au_phone, validate_not_blank, validate_time_slot};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceType {
    Lockout,
    Rekey,
    Installation,
    Repair,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    Standard,
    Urgent,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn next(self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Pending => Some(BookingStatus::Confirmed),
            BookingStatus::Confirmed => Some(BookingStatus::Assigned),
            BookingStatus::Assigned => Some(BookingStatus::InProgress),
            BookingStatus::InProgress => Some(BookingStatus::Completed),
            BookingStatus::Completed | BookingStatus::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingState {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

/// The locksmith dispatched to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct Assignment {
    pub locksmith_id: Uuid,
    #[validate(
        length(min = 2, max = 100, message = "Locksmith name must be 2 to 100 characters"),
        custom = "validate_not_blank"
    )]
    pub locksmith_name: String,
    #[validate(custom = "validate_au_phone")]
    pub locksmith_phone: String,
    #[serde(default)]
    pub estimated_arrival: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: ServiceType,
    pub service_description: Option<String>,
    pub urgency: Urgency,
    pub service_address: Address,
    pub access_instructions: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub service_price_cents: i64,
    pub callout_fee_cents: i64,
    pub estimated_total_cents: i64,
    pub gst_cents: i64,
    pub total_cents: i64,
    pub payment_intent_ref: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub assignment: Option<Assignment>,
    pub tracking_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn state(&self) -> BookingState {
        BookingState {
            status: self.status,
            payment_status: self.payment_status,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct BookingRequest {
    #[validate(
        length(min = 2, max = 100, message = "Name must be 2 to 100 characters"),
        custom = "validate_not_blank"
    )]
    pub name: String,
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Please enter a valid email address")
    )]
    pub email: String,
    #[validate(custom = "validate_au_phone")]
    pub phone: String,
    pub service_type: ServiceType,
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
    #[serde(default)]
    #[validate(length(max = 500, message = "Notes must be less than 500 characters"))]
    pub service_description: Option<String>,
    #[validate]
    pub service_address: Address,
    #[serde(default)]
    #[validate(length(max = 500, message = "Access instructions must be less than 500 characters"))]
    pub access_instructions: Option<String>,
    pub preferred_date: String,
    #[validate(custom = "validate_time_slot")]
    pub preferred_time_slot: String,
    #[serde(default)]
    pub service_price_cents: Option<i64>,
    #[serde(default)]
    pub callout_fee_cents: Option<i64>,
    #[serde(default)]
    pub gst_cents: Option<i64>,
    #[serde(default)]
    pub total_cents: Option<i64>,
}

fn default_urgency() -> Urgency {
    Urgency::Standard
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: ServiceType,
    pub service_description: Option<String>,
    pub urgency: Urgency,
    pub service_address: Address,
    pub access_instructions: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time_slot: String,
    pub quote: BookingQuote,
    pub payment_intent_ref: String,
    pub tracking_token: String,
}

/// Output of a successful booking validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub preferred_date: NaiveDate,
    pub quote: BookingQuote,
}

impl BookingRequest {
    /// `today` is the earliest date a visit may be booked for.
    pub fn checked_quote(&self, today: NaiveDate) -> Result<ValidatedBooking, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        let date = NaiveDate::parse_from_str(self.preferred_date.trim(), "%Y-%m-%d");
        match date {
            Ok(date) if date < today => {
                errors.add("preferred_date", "Preferred date cannot be in the past");
            }
            Ok(_) => {}
            Err(_) => errors.add("preferred_date", "Invalid date format"),
        }

        let preferred_date = match date {
            Ok(date) if errors.is_empty() => date,
            _ => return Err(errors),
        };

        let quote = pricing::quote_booking(self.service_type, self.urgency);
        quote.check_submitted(
            self.service_price_cents,
            self.callout_fee_cents,
            self.gst_cents,
            self.total_cents,
        )?;
        Ok(ValidatedBooking {
            preferred_date,
            quote,
        })
    }

    pub fn into_new_booking(
        self,
        id: Uuid,
        validated: ValidatedBooking,
        payment_intent_ref: String,
        tracking_token: String,
    ) -> NewBooking {
        NewBooking {
            id,
            name: sanitize(&self.name),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            service_type: self.service_type,
            service_description: self
                .service_description
                .as_deref()
                .map(sanitize)
                .filter(|s| !s.is_empty()),
            urgency: self.urgency,
            service_address: self.service_address.sanitized(),
            access_instructions: self
                .access_instructions
                .as_deref()
                .map(sanitize)
                .filter(|s| !s.is_empty()),
            preferred_date: validated.preferred_date,
            preferred_time_slot: self.preferred_time_slot.trim().to_string(),
            quote: validated.quote,
            payment_intent_ref,
            tracking_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn request() -> BookingRequest {
        BookingRequest {
            name: "Sam Lee".to_string(),
            email: "sam@example.com".to_string(),
            phone: "0412 345 678".to_string(),
            service_type: ServiceType::Lockout,
            urgency: Urgency::Standard,
            service_description: Some("Locked out of the front door".to_string()),
            service_address: Address {
                street: "8 Smith Street".to_string(),
                unit: None,
                suburb: "Fitzroy".to_string(),
                state: "VIC".to_string(),
                postcode: "3065".to_string(),
            },
            access_instructions: None,
            preferred_date: "2026-03-04".to_string(),
            preferred_time_slot: "9am-12pm".to_string(),
            service_price_cents: None,
            callout_fee_cents: None,
            gst_cents: None,
            total_cents: None,
        }
    }

    #[test]
    fn status_serialises_in_progress_with_underscore() {
        assert_eq!(BookingStatus::InProgress.as_ref(), "in_progress");
        assert_eq!(
            serde_json::to_string(&BookingStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn lockout_quote_uses_service_price_and_callout() {
        let validated = request().checked_quote(today()).expect("valid");
        assert_eq!(validated.quote.service_price_cents, 15000);
        assert_eq!(validated.quote.callout_fee_cents, 9900);
        assert_eq!(validated.quote.subtotal_cents, 24900);
        assert_eq!(validated.quote.gst_cents, 2490);
        assert_eq!(validated.quote.total_cents, 27390);
    }

    #[test]
    fn past_dates_are_rejected() {
        let mut req = request();
        req.preferred_date = "2026-03-01".to_string();
        assert_eq!(
            req.checked_quote(today()).unwrap_err().get("preferred_date"),
            Some("Preferred date cannot be in the past")
        );
    }

    #[test]
    fn malformed_date_and_slot_are_reported_together() {
        let mut req = request();
        req.preferred_date = "04/03/2026".to_string();
        req.preferred_time_slot = "whenever".to_string();
        let errors = req.checked_quote(today()).unwrap_err();
        assert!(errors.contains("preferred_date"));
        assert!(errors.contains("preferred_time_slot"));
    }

    #[test]
    fn phone_is_required_for_bookings() {
        let mut req = request();
        req.phone = " ".to_string();
        assert_eq!(
            req.checked_quote(today()).unwrap_err().get("phone"),
            Some("Phone number is required")
        );
    }

    #[test]
    fn overlong_notes_and_bad_address_are_reported() {
        let mut req = request();
        req.service_description = Some("x".repeat(501));
        req.service_address.suburb = " ".to_string();
        let errors = req.checked_quote(today()).unwrap_err();
        assert_eq!(
            errors.get("service_description"),
            Some("Notes must be less than 500 characters")
        );
        assert!(errors.contains("service_address.suburb"));
    }

    #[test]
    fn submitted_callout_must_match_urgency() {
        let mut req = request();
        req.urgency = Urgency::Urgent;
        req.callout_fee_cents = Some(9900);
        assert!(req
            .checked_quote(today())
            .unwrap_err()
            .contains("callout_fee_cents"));
    }

    #[test]
    fn assignment_requires_reachable_locksmith() {
        let assignment = Assignment {
            locksmith_id: Uuid::new_v4(),
            locksmith_name: "Alex".to_string(),
            locksmith_phone: "12345".to_string(),
            estimated_arrival: None,
        };
        let errors = FieldErrors::from(assignment.validate().unwrap_err());
        assert!(errors.contains("locksmith_phone"));
    }
}
