//! Collaborator ports and in-memory implementations.
//!
//! Every remote collaborator the saga talks to is a trait here. The
//! in-memory implementations record their calls and can be told to fail or
//! stall, which is how the saga's failure handling is tested.

pub mod attempts;
pub mod document;
pub mod notifier;
pub mod otp;
pub mod signature;
pub mod state_store;
pub mod template;

use std::future::Future;
use std::time::Duration;

pub use attempts::{ClientAttemptStore, InMemoryClientAttemptStore};
pub use document::{
    Attachment, ComposedDocument, DocumentComposer, DocumentRequest, InMemoryDocumentComposer,
};
pub use notifier::{EmailMessage, InMemoryNotifier, Notifier};
pub use otp::{InMemoryOtpIssuer, OtpIssued, OtpIssuer, OtpRequest};
pub use signature::{
    InMemorySignatureInitiator, SignatureInitiator, SignatureRequest, SignatureStarted,
};
pub use state_store::{InMemoryStateStore, StateStore};
pub use template::{InMemoryTemplateRenderer, TemplateRenderer};

use crate::error::ServiceError;

/// Runs a collaborator call with a deadline.
///
/// An elapsed deadline becomes [`ServiceError::Timeout`] naming the
/// operation; the call itself is dropped.
pub async fn timed<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout { operation, after }),
    }
}

/// Sleeps for an injected delay, if any. Used by the in-memory collaborators.
async fn simulate_latency(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_passes_result_through() {
        let ok = timed("test.ok", Duration::from_secs(1), async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = timed("test.err", Duration::from_secs(1), async {
            Err::<u32, _>(ServiceError::rejected("test", "no"))
        })
        .await;
        assert_eq!(err, Err(ServiceError::rejected("test", "no")));
    }

    #[tokio::test]
    async fn test_timed_reports_timeout() {
        let result = timed("test.slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ServiceError>(())
        })
        .await;

        assert_eq!(
            result,
            Err(ServiceError::Timeout {
                operation: "test.slow",
                after: Duration::from_millis(10),
            })
        );
    }
}
