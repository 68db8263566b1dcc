use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::errors::DomainError;
use crate::domain::notification::Notification;
use crate::domain::ports::OutboxRepository;
use crate::domain::validation::{sanitize, validate_not_blank, validate_optional_au_phone};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ContactRequest {
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
    #[serde(default)]
    #[validate(custom = "validate_optional_au_phone")]
    pub phone: Option<String>,
    #[validate(
        length(min = 2, max = 200, message = "Subject must be 2 to 200 characters"),
        custom = "validate_not_blank"
    )]
    pub subject: String,
    #[validate(length(min = 10, max = 1000, message = "Message must be 10 to 1000 characters"))]
    pub message: String,
}

/// Queues contact-form messages for the admin mailbox.
pub struct ContactService {
    outbox: Arc<dyn OutboxRepository>,
}

impl ContactService {
    pub fn new(outbox: Arc<dyn OutboxRepository>) -> Self {
        Self { outbox }
    }

    pub fn submit(&self, request: ContactRequest) -> Result<(), DomainError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        self.outbox.enqueue(&Notification::ContactMessage {
            name: sanitize(&request.name),
            email: email.clone(),
            phone: request
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            subject: sanitize(&request.subject),
            message: sanitize(&request.message),
        })?;
        log::info!("Contact message queued from {email}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryOutbox;

    fn request() -> ContactRequest {
        ContactRequest {
            name: "Jane Citizen".to_string(),
            email: "Jane@Example.com".to_string(),
            phone: None,
            subject: "Lost keys".to_string(),
            message: "Can you cut a spare from a photo?".to_string(),
        }
    }

    #[test]
    fn valid_message_is_queued() {
        let outbox = Arc::new(InMemoryOutbox::default());
        ContactService::new(outbox.clone()).submit(request()).unwrap();
        assert_eq!(outbox.event_types(), vec!["contact_message"]);
    }

    #[test]
    fn missing_fields_are_reported() {
        let outbox = Arc::new(InMemoryOutbox::default());
        let mut req = request();
        req.email = "not-an-email".to_string();
        req.message = "hi".to_string();
        match ContactService::new(outbox.clone()).submit(req).unwrap_err() {
            DomainError::Validation(errors) => {
                assert!(errors.contains("email"));
                assert!(errors.contains("message"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(outbox.event_types().is_empty());
    }
}
