//! OTP issuer port and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::TrackingId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ServiceError;

const SERVICE: &str = "otp_issuer";

/// Request to issue a one-time password for contract acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub business_device_id: String,
    pub request_id: TrackingId,
    pub email: String,
    pub device_name: String,
    pub commerce_name: String,
}

/// An issued OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssued {
    pub expiration_date: DateTime<Utc>,
    pub remaining_resend_attempts: u32,
}

/// Issues OTP codes.
#[async_trait]
pub trait OtpIssuer: Send + Sync {
    /// Issues a code and delivers it to the requested email.
    async fn generate(&self, request: OtpRequest) -> Result<OtpIssued, ServiceError>;
}

#[derive(Debug)]
struct InMemoryOtpState {
    requests: Vec<OtpRequest>,
    validity: Duration,
    remaining_resend_attempts: u32,
    fail_on_generate: bool,
    reject: bool,
}

impl Default for InMemoryOtpState {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            validity: Duration::minutes(5),
            remaining_resend_attempts: 3,
            fail_on_generate: false,
            reject: false,
        }
    }
}

/// In-memory OTP issuer for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOtpIssuer {
    state: Arc<RwLock<InMemoryOtpState>>,
}

impl InMemoryOtpIssuer {
    /// Creates a new in-memory OTP issuer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail as if delivery were down.
    pub async fn set_fail_on_generate(&self, fail: bool) {
        self.state.write().await.fail_on_generate = fail;
    }

    /// Configures the service to refuse requests.
    pub async fn set_reject(&self, reject: bool) {
        self.state.write().await.reject = reject;
    }

    /// Sets the resend allowance reported with each code.
    pub async fn set_remaining_resend_attempts(&self, remaining: u32) {
        self.state.write().await.remaining_resend_attempts = remaining;
    }

    /// Returns the requests received, including failed ones.
    pub async fn requests(&self) -> Vec<OtpRequest> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl OtpIssuer for InMemoryOtpIssuer {
    async fn generate(&self, request: OtpRequest) -> Result<OtpIssued, ServiceError> {
        let mut state = self.state.write().await;
        state.requests.push(request);

        if state.reject {
            return Err(ServiceError::rejected(SERVICE, "resend limit reached"));
        }
        if state.fail_on_generate {
            return Err(ServiceError::unavailable(SERVICE, "mail gateway down"));
        }

        Ok(OtpIssued {
            expiration_date: Utc::now() + state.validity,
            remaining_resend_attempts: state.remaining_resend_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OtpRequest {
        OtpRequest {
            business_device_id: "device-1".into(),
            request_id: TrackingId::new(),
            email: "owner@acme.test".into(),
            device_name: "onboarding-web".into(),
            commerce_name: "Acme".into(),
        }
    }

    #[tokio::test]
    async fn test_generate() {
        let issuer = InMemoryOtpIssuer::new();
        let before = Utc::now();

        let issued = issuer.generate(request()).await.unwrap();

        assert!(issued.expiration_date > before);
        assert_eq!(issued.remaining_resend_attempts, 3);
        assert_eq!(issuer.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_and_fail() {
        let issuer = InMemoryOtpIssuer::new();

        issuer.set_reject(true).await;
        assert!(matches!(
            issuer.generate(request()).await,
            Err(ServiceError::Rejected { .. })
        ));

        issuer.set_reject(false).await;
        issuer.set_fail_on_generate(true).await;
        assert!(matches!(
            issuer.generate(request()).await,
            Err(ServiceError::Unavailable { .. })
        ));
    }
}
