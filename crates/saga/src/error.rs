//! Saga error types.

use std::time::Duration;

use onboarding::OnboardingError;
use thiserror::Error;

/// Failure reported by a remote collaborator behind a port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The requested record does not exist.
    #[error("{service}: {what} not found")]
    NotFound { service: &'static str, what: String },

    /// The collaborator understood the request and refused it.
    #[error("{service} rejected the request: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },

    /// The collaborator could not be reached or failed internally.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The call did not finish within its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl ServiceError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Creates a `Rejected` error.
    pub fn rejected(service: &'static str, reason: impl Into<String>) -> Self {
        ServiceError::Rejected {
            service,
            reason: reason.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(service: &'static str, what: impl Into<String>) -> Self {
        ServiceError::NotFound {
            service,
            what: what.into(),
        }
    }

    /// Returns true if the call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }
}

/// Errors that can occur while running an onboarding saga.
///
/// Each variant corresponds to one trigger of the error taxonomy; see
/// [`crate::classifier::classify`] for the mapping to user-facing codes.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Step validation or the attempt entry guard rejected the request.
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),

    /// The onboarding session could not be loaded.
    #[error("Failed to load onboarding session: {0}")]
    SessionFetch(#[source] ServiceError),

    /// The session lacks fields required to continue.
    #[error("Required onboarding data not found: {}", .missing.join(", "))]
    DataIncomplete { missing: Vec<&'static str> },

    /// A write to the state store failed.
    #[error("Failed to update onboarding state ({step}): {source}")]
    StateUpdate {
        step: &'static str,
        #[source]
        source: ServiceError,
    },

    /// The OTP issuer refused to issue a code.
    #[error("OTP rejected: {0}")]
    OtpRejected(#[source] ServiceError),

    /// The OTP issuer could not deliver a code.
    #[error("OTP could not be sent: {0}")]
    OtpDelivery(#[source] ServiceError),

    /// No attempt record exists for the identification number.
    #[error("Client not found: {0}")]
    ClientNotFound(#[source] ServiceError),

    /// The attempt store failed.
    #[error("Attempt store error: {0}")]
    AttemptStore(#[source] ServiceError),

    /// Electronic signature could not be started.
    #[error("Signature initiation failed: {0}")]
    Signature(#[source] ServiceError),

    /// A document could not be rendered or generated.
    #[error("Document '{document}' failed: {source}")]
    Document {
        document: &'static str,
        #[source]
        source: ServiceError,
    },

    /// The notification email could not be sent.
    #[error("Notification failed: {0}")]
    Notification(#[source] ServiceError),

    /// A collaborator failure with no stage-specific meaning, including
    /// every timeout.
    #[error(transparent)]
    Service(ServiceError),

    /// An internal invariant was broken.
    #[error("Unexpected saga failure: {0}")]
    Unexpected(String),
}

impl SagaError {
    /// Wraps a collaborator error into a stage-specific error.
    ///
    /// Timeouts are kept as [`SagaError::Service`] on every stage so they
    /// always classify as timeouts.
    pub fn from_service(err: ServiceError, wrap: impl FnOnce(ServiceError) -> SagaError) -> Self {
        if err.is_timeout() {
            SagaError::Service(err)
        } else {
            wrap(err)
        }
    }

    /// Creates a [`SagaError::StateUpdate`] for the given step, keeping
    /// timeouts intact.
    pub fn state_update(step: &'static str, err: ServiceError) -> Self {
        Self::from_service(err, |source| SagaError::StateUpdate { step, source })
    }

    /// Creates a [`SagaError::Document`] for the given document, keeping
    /// timeouts intact.
    pub fn document(document: &'static str, err: ServiceError) -> Self {
        Self::from_service(err, |source| SagaError::Document { document, source })
    }

    pub(crate) fn missing_context(what: &str) -> Self {
        SagaError::Unexpected(format!("{what} not available in saga context"))
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_survives_stage_wrapping() {
        let timeout = ServiceError::Timeout {
            operation: "state_store.update_state",
            after: Duration::from_millis(250),
        };
        let err = SagaError::state_update("accept-contract", timeout);
        assert!(matches!(err, SagaError::Service(ServiceError::Timeout { .. })));
        assert_eq!(
            err.to_string(),
            "state_store.update_state timed out after 250ms"
        );
    }

    #[test]
    fn test_non_timeout_is_wrapped() {
        let err = SagaError::state_update(
            "sign-contract",
            ServiceError::unavailable("state_store", "connection refused"),
        );
        assert!(matches!(
            err,
            SagaError::StateUpdate {
                step: "sign-contract",
                ..
            }
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_data_incomplete_lists_fields() {
        let err = SagaError::DataIncomplete {
            missing: vec!["email", "ruc"],
        };
        assert_eq!(
            err.to_string(),
            "Required onboarding data not found: email, ruc"
        );
    }
}
