//! Onboarding session store port and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::SessionId;
use onboarding::{OnboardingSession, StepName, StepResult};
use tokio::sync::RwLock;

use super::simulate_latency;
use crate::error::ServiceError;

const SERVICE: &str = "state_store";

/// Read and write access to onboarding sessions.
///
/// Idempotency of repeated writes for the same session is this
/// collaborator's responsibility; the saga does not deduplicate.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the session with its step ledger.
    async fn get_state(&self, session_id: &SessionId) -> Result<OnboardingSession, ServiceError>;

    /// Records the result of a step.
    async fn update_state(
        &self,
        session_id: &SessionId,
        step: StepName,
        result: StepResult,
    ) -> Result<(), ServiceError>;

    /// Marks the session as finished.
    async fn complete_session(&self, session_id: &SessionId) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryStateStoreState {
    sessions: HashMap<SessionId, OnboardingSession>,
    completed: HashSet<SessionId>,
    get_calls: usize,
    writes: Vec<(SessionId, StepName)>,
    fail_on_get: bool,
    fail_on_update: bool,
    fail_on_complete: bool,
    delay: Option<Duration>,
}

/// In-memory state store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    state: Arc<RwLock<InMemoryStateStoreState>>,
}

impl InMemoryStateStore {
    /// Creates an empty in-memory state store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a session.
    pub async fn insert_session(&self, session: OnboardingSession) {
        self.state
            .write()
            .await
            .sessions
            .insert(session.session_id.clone(), session);
    }

    /// Returns a copy of the stored session.
    pub async fn session(&self, session_id: &SessionId) -> Option<OnboardingSession> {
        self.state.read().await.sessions.get(session_id).cloned()
    }

    /// Configures the service to fail reads.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    /// Configures the service to fail step updates.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Configures the service to fail session completion.
    pub async fn set_fail_on_complete(&self, fail: bool) {
        self.state.write().await.fail_on_complete = fail;
    }

    /// Delays every call by the given duration.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Returns the number of `get_state` calls.
    pub async fn get_count(&self) -> usize {
        self.state.read().await.get_calls
    }

    /// Returns the steps written so far, in call order.
    pub async fn writes(&self) -> Vec<(SessionId, StepName)> {
        self.state.read().await.writes.clone()
    }

    /// Returns the number of successful mutations (step writes and completions).
    pub async fn mutation_count(&self) -> usize {
        let state = self.state.read().await;
        state.writes.len() + state.completed.len()
    }

    /// Returns true if the session was completed.
    pub async fn is_completed(&self, session_id: &SessionId) -> bool {
        self.state.read().await.completed.contains(session_id)
    }

    async fn delay(&self) -> Option<Duration> {
        self.state.read().await.delay
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self, session_id: &SessionId) -> Result<OnboardingSession, ServiceError> {
        simulate_latency(self.delay().await).await;
        let mut state = self.state.write().await;
        state.get_calls += 1;

        if state.fail_on_get {
            return Err(ServiceError::unavailable(SERVICE, "read failed"));
        }

        state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(SERVICE, format!("session {session_id}")))
    }

    async fn update_state(
        &self,
        session_id: &SessionId,
        step: StepName,
        result: StepResult,
    ) -> Result<(), ServiceError> {
        simulate_latency(self.delay().await).await;
        let mut state = self.state.write().await;

        if state.fail_on_update {
            return Err(ServiceError::unavailable(SERVICE, "write failed"));
        }

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| ServiceError::not_found(SERVICE, format!("session {session_id}")))?;
        session.steps.insert(step, result);
        state.writes.push((session_id.clone(), step));
        Ok(())
    }

    async fn complete_session(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        simulate_latency(self.delay().await).await;
        let mut state = self.state.write().await;

        if state.fail_on_complete {
            return Err(ServiceError::unavailable(SERVICE, "completion failed"));
        }
        if !state.sessions.contains_key(session_id) {
            return Err(ServiceError::not_found(
                SERVICE,
                format!("session {session_id}"),
            ));
        }

        state.completed.insert(session_id.clone());
        Ok(())
    }
}
