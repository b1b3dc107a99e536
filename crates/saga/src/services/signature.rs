//! Electronic signature port and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::{SessionId, TrackingId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ServiceError;

const SERVICE: &str = "signature_initiator";

/// Payload for starting an electronic signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub session_id: SessionId,
    pub tracking_id: TrackingId,
    pub node_id: String,
    pub identification: String,
    pub email: String,
    pub company_name: Option<String>,
}

/// Acknowledgement of a started signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStarted {
    pub status: String,
    pub reference_transaction: String,
}

/// Starts electronic signature processes.
#[async_trait]
pub trait SignatureInitiator: Send + Sync {
    async fn start(&self, request: SignatureRequest) -> Result<SignatureStarted, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemorySignatureState {
    requests: Vec<SignatureRequest>,
    next_id: u32,
    fail_on_start: bool,
}

/// In-memory signature initiator for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySignatureInitiator {
    state: Arc<RwLock<InMemorySignatureState>>,
}

impl InMemorySignatureInitiator {
    /// Creates a new in-memory signature initiator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on start.
    pub async fn set_fail_on_start(&self, fail: bool) {
        self.state.write().await.fail_on_start = fail;
    }

    /// Returns the number of start calls received.
    pub async fn start_count(&self) -> usize {
        self.state.read().await.requests.len()
    }
}

#[async_trait]
impl SignatureInitiator for InMemorySignatureInitiator {
    async fn start(&self, request: SignatureRequest) -> Result<SignatureStarted, ServiceError> {
        let mut state = self.state.write().await;
        state.requests.push(request);

        if state.fail_on_start {
            return Err(ServiceError::unavailable(SERVICE, "signature provider down"));
        }

        state.next_id += 1;
        Ok(SignatureStarted {
            status: "STARTED".to_string(),
            reference_transaction: format!("SIG-{:04}", state.next_id),
        })
    }
}
