//! Structured saga results.

use chrono::{DateTime, Utc};
use common::TrackingId;
use onboarding::ClientStatus;
use serde::{Deserialize, Serialize};

use crate::classifier::{ErrorCode, classify};
use crate::error::SagaError;
use crate::services::OtpIssued;

/// Terminal status of a saga invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    Success,
    Error,
}

/// Outcome of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageOutcome {
    /// Not run, either not reached or skipped after a critical failure.
    #[default]
    Pending,
    Success,
    Fail,
}

/// One row of the stage ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: &'static str,
    pub outcome: StageOutcome,
}

/// Ordered per-stage outcomes of one invocation.
///
/// Reports partial progress without having to read logs, e.g. an OTP that
/// was issued before a state write failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageLedger {
    records: Vec<StageRecord>,
}

impl StageLedger {
    /// Creates a ledger with every stage pending.
    pub fn pending(stages: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            records: stages
                .into_iter()
                .map(|stage| StageRecord {
                    stage,
                    outcome: StageOutcome::Pending,
                })
                .collect(),
        }
    }

    /// Sets the outcome of a stage, appending it if unknown.
    pub fn mark(&mut self, stage: &'static str, outcome: StageOutcome) {
        match self.records.iter_mut().find(|r| r.stage == stage) {
            Some(record) => record.outcome = outcome,
            None => self.records.push(StageRecord { stage, outcome }),
        }
    }

    /// Returns the outcome of a stage.
    pub fn outcome(&self, stage: &str) -> Option<StageOutcome> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    /// Returns all records in stage order.
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Returns the names of stages with the given outcome, in stage order.
    pub fn stages_with(&self, outcome: StageOutcome) -> Vec<&'static str> {
        self.records
            .iter()
            .filter(|r| r.outcome == outcome)
            .map(|r| r.stage)
            .collect()
    }
}

/// OTP metadata returned by a successful contract acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpMetadata {
    pub expiration_date: DateTime<Utc>,
    pub remaining_resend_attempts: u32,
}

impl From<OtpIssued> for OtpMetadata {
    fn from(issued: OtpIssued) -> Self {
        Self {
            expiration_date: issued.expiration_date,
            remaining_resend_attempts: issued.remaining_resend_attempts,
        }
    }
}

/// Summary of a successful contract signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcome {
    /// Signature reference, absent when signature initiation failed.
    pub reference_transaction: Option<String>,
    /// File names of the documents produced for the notification.
    pub attachments: Vec<String>,
}

/// Operation-specific data carried by a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaOutput {
    Otp(OtpMetadata),
    /// Attempts left after a failed identity verification.
    Attempts {
        remaining: u32,
        status: ClientStatus,
    },
    Signed(SignOutcome),
}

/// The single structured result of a saga invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaResult {
    pub status: SagaStatus,
    pub tracking_id: TrackingId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SagaOutput>,
    pub stages: StageLedger,
}

impl SagaResult {
    /// Creates a successful result.
    pub fn success(tracking_id: TrackingId, data: SagaOutput, stages: StageLedger) -> Self {
        Self {
            status: SagaStatus::Success,
            tracking_id,
            message: None,
            error_code: None,
            data: Some(data),
            stages,
        }
    }

    /// Creates an error result from a classified failure.
    pub fn failure(tracking_id: TrackingId, err: &SagaError, stages: StageLedger) -> Self {
        let classified = classify(err);
        Self {
            status: SagaStatus::Error,
            tracking_id,
            message: Some(classified.message),
            error_code: Some(classified.code),
            data: None,
            stages,
        }
    }

    /// Attaches operation data.
    pub fn with_data(mut self, data: SagaOutput) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns true if the saga succeeded.
    pub fn is_success(&self) -> bool {
        self.status == SagaStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn test_ledger_starts_pending_and_keeps_order() {
        let mut ledger = StageLedger::pending(["fetch", "write", "notify"]);
        ledger.mark("write", StageOutcome::Fail);
        ledger.mark("fetch", StageOutcome::Success);

        let names: Vec<_> = ledger.records().iter().map(|r| r.stage).collect();
        assert_eq!(names, vec!["fetch", "write", "notify"]);
        assert_eq!(ledger.outcome("notify"), Some(StageOutcome::Pending));
        assert_eq!(ledger.stages_with(StageOutcome::Fail), vec!["write"]);
        assert_eq!(ledger.outcome("unknown"), None);
    }

    #[test]
    fn test_mark_unknown_stage_appends() {
        let mut ledger = StageLedger::default();
        ledger.mark("late", StageOutcome::Success);
        assert_eq!(ledger.records().len(), 1);
    }

    #[test]
    fn test_failure_result_is_classified() {
        let err = SagaError::SessionFetch(ServiceError::unavailable("state_store", "down"));
        let result = SagaResult::failure(TrackingId::new(), &err, StageLedger::default());

        assert!(!result.is_success());
        assert_eq!(result.error_code, Some(ErrorCode::OnbGetSessionFail));
        assert_eq!(
            result.message.as_deref(),
            Some("Failed to get onboarding session")
        );
    }

    #[test]
    fn test_result_serialization_shape() {
        let mut stages = StageLedger::pending(["a", "b"]);
        stages.mark("a", StageOutcome::Success);
        let result = SagaResult::success(
            TrackingId::new(),
            SagaOutput::Signed(SignOutcome {
                reference_transaction: None,
                attachments: vec!["contract.pdf".into()],
            }),
            stages,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("errorCode").is_none());
        assert_eq!(json["data"]["type"], "Signed");
        assert_eq!(json["data"]["data"]["attachments"][0], "contract.pdf");
        assert_eq!(json["stages"][0]["stage"], "a");
        assert_eq!(json["stages"][0]["outcome"], "SUCCESS");
        assert_eq!(json["stages"][1]["outcome"], "PENDING");
    }
}
