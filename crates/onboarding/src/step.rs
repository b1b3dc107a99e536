//! Step ledger entries.

use serde::{Deserialize, Serialize};

/// The onboarding steps tracked in a session ledger.
///
/// Declaration order is the order in which the workflow normally visits
/// them, which is also the iteration order of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepName {
    #[serde(rename = "start-onb-cnb")]
    StartOnbCnb,
    #[serde(rename = "confirm-data")]
    ConfirmData,
    #[serde(rename = "cnb-facial")]
    CnbFacial,
    #[serde(rename = "cnb-liveness")]
    CnbLiveness,
    #[serde(rename = "cnb-document")]
    CnbDocument,
    /// Contract accepted, waiting for the OTP to be confirmed.
    #[serde(rename = "accept-contract")]
    AcceptContract,
    #[serde(rename = "validate-otp")]
    ValidateOtp,
    #[serde(rename = "sign-contract")]
    SignContract,
}

impl StepName {
    /// All steps, in workflow order.
    pub const ALL: [StepName; 8] = [
        StepName::StartOnbCnb,
        StepName::ConfirmData,
        StepName::CnbFacial,
        StepName::CnbLiveness,
        StepName::CnbDocument,
        StepName::AcceptContract,
        StepName::ValidateOtp,
        StepName::SignContract,
    ];

    /// Returns true for the identity checks that carry a verification outcome.
    pub fn is_identity_check(&self) -> bool {
        matches!(
            self,
            StepName::CnbFacial | StepName::CnbLiveness | StepName::CnbDocument
        )
    }

    /// Returns the ledger key used by the state store.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::StartOnbCnb => "start-onb-cnb",
            StepName::ConfirmData => "confirm-data",
            StepName::CnbFacial => "cnb-facial",
            StepName::CnbLiveness => "cnb-liveness",
            StepName::CnbDocument => "cnb-document",
            StepName::AcceptContract => "accept-contract",
            StepName::ValidateOtp => "validate-otp",
            StepName::SignContract => "sign-contract",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Success,
    Pending,
    Failed,
}

/// Verdict of an identity check (facial, liveness, document).
///
/// This is separate from [`StepStatus`]: a step can be recorded as
/// `SUCCESS` while the provider verdict is still `PENDING` or `FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    FinalizedOk,
    Pending,
    Failed,
}

/// One entry of the session step ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_outcome: Option<VerificationOutcome>,
    /// Opaque payload written by whoever completed the step.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl StepResult {
    /// Creates a step result with the given status and no payload.
    pub fn new(status: StepStatus) -> Self {
        Self {
            status,
            verification_outcome: None,
            data: serde_json::Value::Null,
        }
    }

    /// Creates a successful step result.
    pub fn success() -> Self {
        Self::new(StepStatus::Success)
    }

    /// Creates a pending step result.
    pub fn pending() -> Self {
        Self::new(StepStatus::Pending)
    }

    /// Creates a failed step result.
    pub fn failed() -> Self {
        Self::new(StepStatus::Failed)
    }

    /// Attaches a verification outcome.
    pub fn with_outcome(mut self, outcome: VerificationOutcome) -> Self {
        self.verification_outcome = Some(outcome);
        self
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Returns true if the step completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}
