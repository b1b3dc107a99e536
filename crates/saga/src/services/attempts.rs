//! Client attempt store port and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use onboarding::ClientAttemptState;
use tokio::sync::RwLock;

use super::simulate_latency;
use crate::error::ServiceError;

const SERVICE: &str = "client_attempt_store";

/// Access to clients' remaining identity-verification attempts.
#[async_trait]
pub trait ClientAttemptStore: Send + Sync {
    /// Looks up a client by identification number.
    async fn get_by_identification(
        &self,
        identification: &str,
    ) -> Result<ClientAttemptState, ServiceError>;

    /// Persists a new attempt count and status for a client.
    async fn update_status(&self, state: &ClientAttemptState) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryAttemptState {
    by_identification: HashMap<String, ClientAttemptState>,
    updates: Vec<ClientAttemptState>,
    lookups: usize,
    fail_on_get: bool,
    fail_on_update: bool,
    update_delay: Option<Duration>,
}

/// In-memory attempt store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientAttemptStore {
    state: Arc<RwLock<InMemoryAttemptState>>,
}

impl InMemoryClientAttemptStore {
    /// Creates an empty in-memory attempt store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client under an identification number.
    pub async fn insert(&self, identification: impl Into<String>, client: ClientAttemptState) {
        self.state
            .write()
            .await
            .by_identification
            .insert(identification.into(), client);
    }

    /// Returns the stored state for an identification number.
    pub async fn client(&self, identification: &str) -> Option<ClientAttemptState> {
        self.state
            .read()
            .await
            .by_identification
            .get(identification)
            .cloned()
    }

    /// Configures the service to fail lookups.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    /// Configures the service to fail updates.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Delays every update by the given duration.
    pub async fn set_update_delay(&self, delay: Option<Duration>) {
        self.state.write().await.update_delay = delay;
    }

    /// Returns the updates received, in call order.
    pub async fn updates(&self) -> Vec<ClientAttemptState> {
        self.state.read().await.updates.clone()
    }

    /// Returns the number of lookups received.
    pub async fn lookup_count(&self) -> usize {
        self.state.read().await.lookups
    }
}

#[async_trait]
impl ClientAttemptStore for InMemoryClientAttemptStore {
    async fn get_by_identification(
        &self,
        identification: &str,
    ) -> Result<ClientAttemptState, ServiceError> {
        let mut state = self.state.write().await;
        state.lookups += 1;

        if state.fail_on_get {
            return Err(ServiceError::unavailable(SERVICE, "lookup failed"));
        }

        state
            .by_identification
            .get(identification)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(SERVICE, format!("client {identification}")))
    }

    async fn update_status(&self, update: &ClientAttemptState) -> Result<(), ServiceError> {
        let delay = self.state.read().await.update_delay;
        simulate_latency(delay).await;

        let mut state = self.state.write().await;

        if state.fail_on_update {
            return Err(ServiceError::unavailable(SERVICE, "update failed"));
        }

        let client = state
            .by_identification
            .values_mut()
            .find(|c| c.client_id == update.client_id)
            .ok_or_else(|| {
                ServiceError::not_found(SERVICE, format!("client {}", update.client_id))
            })?;
        *client = update.clone();
        state.updates.push(update.clone());
        Ok(())
    }
}
