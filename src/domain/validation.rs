//! Input checks shared by the order, booking, address and contact flows.
//!
//! Request types derive `validator::Validate`; the functions here are the
//! `custom` validators for rules the built-in ones do not cover.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Australian mobile and landline numbers, e.g. `0412 345 678` or `+61 2 9876 5432`.
static AU_PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+?61|0)[2-478](?:[ -]?[0-9]){8}$").expect("valid phone regex")
});

static POSTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("valid postcode regex"));

static CLOCK_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

const AUSTRALIAN_STATES: [&str; 8] = ["NSW", "VIC", "QLD", "SA", "WA", "TAS", "NT", "ACT"];

const TIME_SLOTS: [&str; 3] = ["9am-12pm", "12pm-3pm", "3pm-6pm"];

const MAX_INPUT_LEN: usize = 1000;

const PHONE_MESSAGE: &str = "Please enter a valid Australian phone number (e.g., 0412 345 678)";

/// Trims, drops angle brackets and caps the length of free text.
pub fn sanitize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_INPUT_LEN)
        .collect()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn is_valid_au_phone(phone: &str) -> bool {
    AU_PHONE_RE.is_match(phone.trim())
}

fn is_http_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && url.len() > "https://".len()
}

/// Whitespace-only text passes `length(min = ..)`, so required fields add this.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("required", "This field is required"))
    } else {
        Ok(())
    }
}

pub fn validate_au_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        Err(invalid("required", "Phone number is required"))
    } else if !is_valid_au_phone(phone) {
        Err(invalid("phone", PHONE_MESSAGE))
    } else {
        Ok(())
    }
}

/// For optional phone fields a blank value means "not given".
pub fn validate_optional_au_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() || is_valid_au_phone(phone) {
        Ok(())
    } else {
        Err(invalid("phone", PHONE_MESSAGE))
    }
}

pub fn validate_postcode(postcode: &str) -> Result<(), ValidationError> {
    if POSTCODE_RE.is_match(postcode.trim()) {
        Ok(())
    } else {
        Err(invalid("postcode", "Please enter a valid 4-digit postcode"))
    }
}

pub fn validate_state(state: &str) -> Result<(), ValidationError> {
    if AUSTRALIAN_STATES.contains(&state.trim().to_uppercase().as_str()) {
        Ok(())
    } else {
        Err(invalid("state", "Please select a valid Australian state"))
    }
}

/// A booking time is either one of the fixed slots or a 24h `HH:MM` time.
pub fn validate_time_slot(slot: &str) -> Result<(), ValidationError> {
    let slot = slot.trim();
    if TIME_SLOTS.contains(&slot) || CLOCK_TIME_RE.is_match(slot) {
        Ok(())
    } else {
        Err(invalid("time_slot", "Invalid time format"))
    }
}

pub fn validate_photo_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.iter().all(|u| is_http_url(u)) {
        Ok(())
    } else {
        Err(invalid("url", "Invalid photo URL"))
    }
}

pub fn validate_optional_photo_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() || is_http_url(url) {
        Ok(())
    } else {
        Err(invalid("url", "Invalid verification photo URL"))
    }
}
