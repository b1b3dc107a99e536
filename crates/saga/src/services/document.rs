//! Document composer port and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ServiceError;

const SERVICE: &str = "document_composer";

/// Request to turn rendered HTML into a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub commerce_id: String,
    pub identification: String,
    pub html: Vec<String>,
    pub file_name: String,
    pub description: String,
}

/// A stored document reachable through a signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub signed_url: String,
    pub file_name: String,
}

/// Result of a document generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedDocument {
    pub attachments: Vec<Attachment>,
}

/// Generates documents from HTML.
#[async_trait]
pub trait DocumentComposer: Send + Sync {
    async fn generate(&self, request: DocumentRequest) -> Result<ComposedDocument, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryDocumentState {
    requests: Vec<DocumentRequest>,
    fail_on_generate: bool,
}

/// In-memory document composer for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentComposer {
    state: Arc<RwLock<InMemoryDocumentState>>,
}

impl InMemoryDocumentComposer {
    /// Creates a new in-memory document composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on generate.
    pub async fn set_fail_on_generate(&self, fail: bool) {
        self.state.write().await.fail_on_generate = fail;
    }

    /// Returns the number of generate calls received.
    pub async fn generate_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// Returns the requests received, in call order.
    pub async fn requests(&self) -> Vec<DocumentRequest> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl DocumentComposer for InMemoryDocumentComposer {
    async fn generate(&self, request: DocumentRequest) -> Result<ComposedDocument, ServiceError> {
        let mut state = self.state.write().await;
        let fail = state.fail_on_generate;
        let attachment = Attachment {
            signed_url: format!(
                "https://documents.test/{}/{}?sig={}",
                request.commerce_id,
                request.file_name,
                state.requests.len() + 1
            ),
            file_name: request.file_name.clone(),
        };
        state.requests.push(request);

        if fail {
            return Err(ServiceError::unavailable(SERVICE, "pdf engine down"));
        }

        Ok(ComposedDocument {
            attachments: vec![attachment],
        })
    }
}
