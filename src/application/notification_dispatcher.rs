use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::notification::EmailContext;
use crate::domain::outbox::OutboxMessage;
use crate::domain::ports::{EmailSender, OutboxRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Drains the notification outbox. Delivery is at-least-once: a message is
/// marked dispatched only after the provider accepted it.
pub struct NotificationDispatcher {
    outbox: Arc<dyn OutboxRepository>,
    sender: Arc<dyn EmailSender>,
    context: EmailContext,
    batch_size: i64,
    max_attempts: i32,
}

impl NotificationDispatcher {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        sender: Arc<dyn EmailSender>,
        context: EmailContext,
        batch_size: i64,
        max_attempts: i32,
    ) -> Self {
        Self {
            outbox,
            sender,
            context,
            batch_size,
            max_attempts,
        }
    }

    /// Sends one batch. Send failures are logged and recorded against the
    /// message; only outbox storage errors are returned.
    pub fn dispatch_pending(&self) -> Result<DispatchReport, DomainError> {
        let messages = self.outbox.fetch_pending(self.batch_size, self.max_attempts)?;
        let mut report = DispatchReport::default();
        for message in messages {
            match self.deliver(&message) {
                Ok(()) => {
                    self.outbox.mark_dispatched(message.id)?;
                    report.sent += 1;
                }
                Err(e) => {
                    log::error!(
                        "Failed to send {} for {} {}: {e}",
                        message.event_type,
                        message.aggregate_type,
                        message.aggregate_id
                    );
                    self.outbox.record_failure(message.id, &e.to_string())?;
                    if message.attempts + 1 >= self.max_attempts {
                        log::warn!(
                            "Giving up on outbox message {} after {} attempts",
                            message.id,
                            message.attempts + 1
                        );
                    }
                    report.failed += 1;
                }
            }
        }
        if report.sent + report.failed > 0 {
            log::info!("Outbox batch: {} sent, {} failed", report.sent, report.failed);
        }
        Ok(report)
    }

    fn deliver(&self, message: &OutboxMessage) -> Result<(), DomainError> {
        let email = message.notification()?.render(&self.context);
        self.sender.send(&email)
    }
}
