//! Onboarding domain errors.

use common::ClientId;
use thiserror::Error;

use crate::step::StepName;

/// Errors raised by step validation and the attempt policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OnboardingError {
    /// A required step is missing from the ledger or did not succeed.
    #[error("Step '{step}' is missing or not completed")]
    StepInvalid { step: StepName },

    /// An identity check has not produced a final verdict yet.
    #[error("Identity verification for '{step}' is still pending")]
    DocumentIdPending { step: StepName },

    /// An identity check finished with a negative verdict.
    #[error("Identity verification for '{step}' failed")]
    IdentityFailed { step: StepName },

    /// The client has no identity-verification attempts left.
    #[error("Client {client_id} is permanently blocked")]
    BlockedPermanently { client_id: ClientId },
}

impl OnboardingError {
    /// Returns true if this error must consume one verification attempt.
    pub fn triggers_attempt_limit(&self) -> bool {
        matches!(self, OnboardingError::IdentityFailed { .. })
    }

    /// Returns the step this error refers to, if any.
    pub fn step(&self) -> Option<StepName> {
        match self {
            OnboardingError::StepInvalid { step }
            | OnboardingError::DocumentIdPending { step }
            | OnboardingError::IdentityFailed { step } => Some(*step),
            OnboardingError::BlockedPermanently { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_identity_failure_triggers_attempt_limit() {
        assert!(
            OnboardingError::IdentityFailed {
                step: StepName::CnbDocument
            }
            .triggers_attempt_limit()
        );
        assert!(
            !OnboardingError::DocumentIdPending {
                step: StepName::CnbDocument
            }
            .triggers_attempt_limit()
        );
        assert!(
            !OnboardingError::StepInvalid {
                step: StepName::ConfirmData
            }
            .triggers_attempt_limit()
        );
    }

    #[test]
    fn test_message_names_step() {
        let err = OnboardingError::StepInvalid {
            step: StepName::ConfirmData,
        };
        assert_eq!(err.to_string(), "Step 'confirm-data' is missing or not completed");
        assert_eq!(err.step(), Some(StepName::ConfirmData));
    }
}
