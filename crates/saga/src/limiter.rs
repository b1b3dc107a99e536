//! Attempt limiter: consumes a verification attempt and persists it.

use std::sync::Arc;
use std::time::Duration;

use common::ClientId;
use onboarding::AttemptDecrement;

use crate::error::SagaError;
use crate::services::{ClientAttemptStore, timed};

/// Result of a limiter run.
///
/// The decrement is always computed; persisting it is reported separately
/// and never changes the computed values.
#[derive(Debug)]
pub struct LimiterOutcome {
    pub decrement: AttemptDecrement,
    pub persist_error: Option<SagaError>,
}

/// Applies the attempt policy after a failed identity verification.
#[derive(Clone)]
pub struct AttemptLimiter {
    store: Arc<dyn ClientAttemptStore>,
    call_timeout: Duration,
}

impl AttemptLimiter {
    /// Creates a limiter that persists through the given store.
    pub fn new(store: Arc<dyn ClientAttemptStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Consumes one attempt for the client and persists the new state.
    ///
    /// Fails only when the client has no attempts left to consume. Any
    /// failure to persist, a timeout included, is reported as
    /// [`SagaError::AttemptStore`] in the outcome.
    #[tracing::instrument(skip(self, client_id), fields(client_id = %client_id))]
    pub async fn decrement(
        &self,
        client_id: &ClientId,
        current_remaining: u32,
    ) -> Result<LimiterOutcome, SagaError> {
        let decrement = onboarding::decrement(client_id, current_remaining)?;
        metrics::counter!("onboarding_attempts_decremented_total").increment(1);

        let persisted = timed(
            "client_attempt_store.update_status",
            self.call_timeout,
            self.store.update_status(&decrement.to_state()),
        )
        .await;

        let persist_error = match persisted {
            Ok(()) => {
                tracing::info!(
                    remaining = decrement.new_remaining,
                    status = %decrement.new_status,
                    "verification attempt consumed"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    remaining = decrement.new_remaining,
                    status = %decrement.new_status,
                    error = %err,
                    "failed to persist attempt state"
                );
                Some(SagaError::AttemptStore(err))
            }
        };

        Ok(LimiterOutcome {
            decrement,
            persist_error,
        })
    }
}

impl std::fmt::Debug for AttemptLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptLimiter")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use onboarding::{ClientAttemptState, ClientStatus, OnboardingError};

    use super::*;
    use crate::error::ServiceError;
    use crate::services::InMemoryClientAttemptStore;

    async fn setup(remaining: u32) -> (AttemptLimiter, InMemoryClientAttemptStore) {
        let store = InMemoryClientAttemptStore::new();
        store
            .insert("id-1", ClientAttemptState::new(ClientId::new("c-1"), remaining))
            .await;
        let limiter = AttemptLimiter::new(Arc::new(store.clone()), Duration::from_secs(1));
        (limiter, store)
    }

    #[tokio::test]
    async fn test_decrement_persists_new_state() {
        let (limiter, store) = setup(2).await;

        let outcome = limiter.decrement(&ClientId::new("c-1"), 2).await.unwrap();

        assert!(outcome.persist_error.is_none());
        assert_eq!(outcome.decrement.new_remaining, 1);
        assert_eq!(outcome.decrement.new_status, ClientStatus::Remaining);
        let stored = store.client("id-1").await.unwrap();
        assert_eq!(stored.remaining_attempts_onb, 1);
        assert_eq!(stored.status, ClientStatus::Remaining);
    }

    #[tokio::test]
    async fn test_last_attempt_blocks_client() {
        let (limiter, store) = setup(1).await;

        let outcome = limiter.decrement(&ClientId::new("c-1"), 1).await.unwrap();

        assert_eq!(outcome.decrement.new_remaining, 0);
        assert_eq!(outcome.decrement.new_status, ClientStatus::BlockedPermanent);
        assert!(store.client("id-1").await.unwrap().is_blocked());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_computed_values() {
        let (limiter, store) = setup(3).await;
        store.set_fail_on_update(true).await;

        let outcome = limiter.decrement(&ClientId::new("c-1"), 3).await.unwrap();

        assert_eq!(outcome.decrement.new_remaining, 2);
        assert_eq!(outcome.decrement.new_status, ClientStatus::Remaining);
        assert!(matches!(
            outcome.persist_error,
            Some(SagaError::AttemptStore(_))
        ));
    }

    #[tokio::test]
    async fn test_persist_timeout_is_an_attempt_store_error() {
        let store = InMemoryClientAttemptStore::new();
        store
            .insert("id-1", ClientAttemptState::new(ClientId::new("c-1"), 2))
            .await;
        store
            .set_update_delay(Some(Duration::from_millis(200)))
            .await;
        let limiter = AttemptLimiter::new(Arc::new(store.clone()), Duration::from_millis(20));

        let outcome = limiter.decrement(&ClientId::new("c-1"), 2).await.unwrap();

        assert_eq!(outcome.decrement.new_remaining, 1);
        assert!(matches!(
            outcome.persist_error,
            Some(SagaError::AttemptStore(ServiceError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_client_is_rejected_without_store_call() {
        let (limiter, store) = setup(0).await;

        let result = limiter.decrement(&ClientId::new("c-1"), 0).await;

        assert!(matches!(
            result,
            Err(SagaError::Onboarding(
                OnboardingError::BlockedPermanently { .. }
            ))
        ));
        assert!(store.updates().await.is_empty());
    }
}
