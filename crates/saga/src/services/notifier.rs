//! Notification port and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::document::Attachment;
use crate::error::ServiceError;

const SERVICE: &str = "notifier";

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Sends notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<EmailMessage>,
    attempts: usize,
    fail_on_send: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on send.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Returns the emails delivered.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.state.read().await.sent.clone()
    }

    /// Returns the number of send calls, including failed ones.
    pub async fn attempt_count(&self) -> usize {
        self.state.read().await.attempts
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_email(&self, message: EmailMessage) -> Result<(), ServiceError> {
        let mut state = self.state.write().await;
        state.attempts += 1;

        if state.fail_on_send {
            return Err(ServiceError::unavailable(SERVICE, "smtp relay down"));
        }

        state.sent.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "owner@acme.test".into(),
            subject: "Documents".into(),
            body: "Hello".into(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_send_records_message() {
        let notifier = InMemoryNotifier::new();
        notifier.send_email(message()).await.unwrap();

        assert_eq!(notifier.sent().await, vec![message()]);
        assert_eq!(notifier.attempt_count().await, 1);
    }

    #[tokio::test]
    async fn test_fail_on_send() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_on_send(true).await;

        assert!(notifier.send_email(message()).await.is_err());
        assert!(notifier.sent().await.is_empty());
        assert_eq!(notifier.attempt_count().await, 1);
    }
}
