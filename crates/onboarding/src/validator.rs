//! Step ledger validation.

use crate::error::OnboardingError;
use crate::session::OnboardingSession;
use crate::step::{StepName, VerificationOutcome};

/// Steps that must be complete before a contract can be accepted.
pub const ACCEPT_CONTRACT_REQUIRED_STEPS: [StepName; 5] = [
    StepName::StartOnbCnb,
    StepName::ConfirmData,
    StepName::CnbFacial,
    StepName::CnbLiveness,
    StepName::CnbDocument,
];

/// Outcome of validating a session ledger.
pub type ValidationOutcome = Result<(), OnboardingError>;

/// Checks a session ledger against an ordered list of required steps.
///
/// Validation is fail-fast: the first offending step in list order decides
/// the error. For identity checks the verification outcome is inspected
/// before the top-level status, so a failed verdict is always reported as
/// [`OnboardingError::IdentityFailed`] and consumes an attempt. Other
/// steps are judged by status alone.
#[derive(Debug, Clone)]
pub struct StepValidator {
    required: Vec<StepName>,
}

impl StepValidator {
    /// Creates a validator for the given steps, checked in iteration order.
    pub fn new(required: impl IntoIterator<Item = StepName>) -> Self {
        Self {
            required: required.into_iter().collect(),
        }
    }

    /// Validator for the accept-contract operation.
    pub fn for_accept_contract() -> Self {
        Self::new(ACCEPT_CONTRACT_REQUIRED_STEPS)
    }

    /// Returns the required steps in check order.
    pub fn required_steps(&self) -> &[StepName] {
        &self.required
    }

    /// Validates the session ledger.
    pub fn validate(&self, session: &OnboardingSession) -> ValidationOutcome {
        for &step in &self.required {
            let Some(result) = session.step(step) else {
                tracing::debug!(%step, session_id = %session.session_id, "required step missing");
                return Err(OnboardingError::StepInvalid { step });
            };

            let outcome = result
                .verification_outcome
                .filter(|_| step.is_identity_check());
            match outcome {
                Some(VerificationOutcome::Pending) => {
                    return Err(OnboardingError::DocumentIdPending { step });
                }
                Some(VerificationOutcome::Failed) => {
                    return Err(OnboardingError::IdentityFailed { step });
                }
                Some(VerificationOutcome::FinalizedOk) | None => {}
            }

            if !result.is_success() {
                return Err(OnboardingError::StepInvalid { step });
            }
        }
        Ok(())
    }
}

impl Default for StepValidator {
    fn default() -> Self {
        Self::for_accept_contract()
    }
}
