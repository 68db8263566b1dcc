use reqwest::blocking::Client;
use serde::Serialize;

use crate::domain::errors::DomainError;
use crate::domain::notification::EmailMessage;
use crate::domain::ports::EmailSender;

pub const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Transactional e-mail through the Resend HTTP API.
pub struct ResendEmailSender {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendEmailSender {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| DomainError::Upstream(format!("resend client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        })
    }

    fn request<'a>(&'a self, message: &'a EmailMessage) -> SendRequest<'a> {
        SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        }
    }
}

impl EmailSender for ResendEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request(message))
            .send()
            .map_err(|e| DomainError::Upstream(format!("resend: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DomainError::Upstream(format!("resend returned {status}: {body}")));
        }
        Ok(())
    }
}
