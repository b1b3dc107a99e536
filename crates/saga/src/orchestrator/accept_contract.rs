//! Accept-contract saga: validate the onboarding steps, then issue the OTP
//! that confirms acceptance.
//!
//! Every stage is critical. A failed identity verification consumes one of
//! the client's attempts before the error is returned.

use common::{SessionId, TrackingId};
use onboarding::{
    AttemptDecrement, ClientAttemptState, OnboardingSession, StepName, StepResult,
    ensure_not_blocked,
};
use serde_json::json;

use super::{SagaEnv, SagaRequest, loaded};
use crate::error::{SagaError, ServiceError};
use crate::result::{SagaOutput, SagaResult};
use crate::services::{OtpIssued, OtpRequest, timed};
use crate::stage::{DriverReport, StageContext, StageDescriptor, StageFuture};

pub(crate) const OPERATION: &str = "accept_contract";

/// Loads the session and the client's attempt state.
pub const FETCH_STATE: &str = "fetch-state";
/// Rejects clients without attempts left.
pub const CHECK_ATTEMPTS: &str = "check-attempts";
/// Checks the step ledger; consumes an attempt on failed verification.
pub const VALIDATE_STEPS: &str = "validate-steps";
pub const ISSUE_OTP: &str = "issue-otp";
/// Records the acceptance as pending OTP confirmation.
pub const PERSIST_ACCEPTANCE: &str = "persist-acceptance";

/// Per-request state threaded through the stages.
pub(crate) struct AcceptContractContext {
    request: SagaRequest,
    tracking_id: TrackingId,
    session: Option<OnboardingSession>,
    attempts: Option<ClientAttemptState>,
    decrement: Option<AttemptDecrement>,
    otp: Option<OtpIssued>,
}

impl AcceptContractContext {
    pub(crate) fn new(request: SagaRequest, tracking_id: TrackingId) -> Self {
        Self {
            request,
            tracking_id,
            session: None,
            attempts: None,
            decrement: None,
            otp: None,
        }
    }

    fn attempts(&self) -> Result<&ClientAttemptState, SagaError> {
        self.attempts
            .as_ref()
            .ok_or_else(|| SagaError::missing_context("client attempt state"))
    }
}

impl StageContext for AcceptContractContext {
    fn session_id(&self) -> &SessionId {
        &self.request.session_id
    }

    fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }
}

pub(crate) fn stages() -> Vec<StageDescriptor<SagaEnv, AcceptContractContext>> {
    vec![
        StageDescriptor::critical(FETCH_STATE, fetch_state),
        StageDescriptor::critical(CHECK_ATTEMPTS, check_attempts),
        StageDescriptor::critical(VALIDATE_STEPS, validate_steps),
        StageDescriptor::critical(ISSUE_OTP, issue_otp),
        StageDescriptor::critical(PERSIST_ACCEPTANCE, persist_acceptance),
    ]
}

/// Builds the result from the final context.
pub(crate) fn finish(ctx: AcceptContractContext, report: DriverReport) -> SagaResult {
    let DriverReport { stages, failure } = report;

    match (failure, ctx.otp) {
        (Some(err), _) => {
            let result = SagaResult::failure(ctx.tracking_id, &err, stages);
            match ctx.decrement {
                Some(decrement) => result.with_data(SagaOutput::Attempts {
                    remaining: decrement.new_remaining,
                    status: decrement.new_status,
                }),
                None => result,
            }
        }
        (None, Some(otp)) => SagaResult::success(ctx.tracking_id, SagaOutput::Otp(otp.into()), stages),
        (None, None) => SagaResult::failure(
            ctx.tracking_id,
            &SagaError::missing_context("issued OTP"),
            stages,
        ),
    }
}

fn fetch_state<'a>(env: &'a SagaEnv, ctx: &'a mut AcceptContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let timeout = env.config.call_timeout;
        let (session, attempts) = tokio::join!(
            timed(
                "state_store.get_state",
                timeout,
                env.ports.state_store.get_state(&ctx.request.session_id),
            ),
            timed(
                "client_attempt_store.get_by_identification",
                timeout,
                env.ports
                    .attempts
                    .get_by_identification(&ctx.request.identification),
            ),
        );

        ctx.session = Some(session.map_err(|e| SagaError::from_service(e, SagaError::SessionFetch))?);
        ctx.attempts = Some(attempts.map_err(attempt_lookup_error)?);
        Ok(())
    })
}

fn check_attempts<'a>(_env: &'a SagaEnv, ctx: &'a mut AcceptContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        ensure_not_blocked(ctx.attempts()?)?;
        Ok(())
    })
}

fn validate_steps<'a>(env: &'a SagaEnv, ctx: &'a mut AcceptContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let Err(err) = env.validator.validate(loaded(ctx.session.as_ref())?) else {
            return Ok(());
        };
        if !err.triggers_attempt_limit() {
            return Err(err.into());
        }

        let attempts = ctx.attempts()?.clone();
        let outcome = env
            .limiter
            .decrement(&attempts.client_id, attempts.remaining_attempts_onb)
            .await?;
        ctx.decrement = Some(outcome.decrement);

        Err(outcome.persist_error.unwrap_or_else(|| err.into()))
    })
}

fn issue_otp<'a>(env: &'a SagaEnv, ctx: &'a mut AcceptContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let session = loaded(ctx.session.as_ref())?;
        let email = session
            .contact_email()
            .ok_or_else(|| SagaError::DataIncomplete {
                missing: vec!["email"],
            })?;

        let request = OtpRequest {
            business_device_id: ctx.request.device_id.clone(),
            request_id: ctx.tracking_id,
            email: email.to_string(),
            device_name: env.config.otp_device_name.clone(),
            commerce_name: session.company_name.clone().unwrap_or_default(),
        };

        let issued = timed(
            "otp_issuer.generate",
            env.config.call_timeout,
            env.ports.otp.generate(request),
        )
        .await
        .map_err(otp_error)?;

        tracing::debug!(
            expiration_date = %issued.expiration_date,
            remaining_resend_attempts = issued.remaining_resend_attempts,
            "otp issued"
        );
        ctx.otp = Some(issued);
        Ok(())
    })
}

fn persist_acceptance<'a>(env: &'a SagaEnv, ctx: &'a mut AcceptContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let otp = ctx
            .otp
            .as_ref()
            .ok_or_else(|| SagaError::missing_context("issued OTP"))?;
        let step = StepResult::pending().with_data(json!({
            "trackingId": ctx.tracking_id,
            "otpExpirationDate": otp.expiration_date,
            "remainingResendAttempts": otp.remaining_resend_attempts,
        }));

        timed(
            "state_store.update_state",
            env.config.call_timeout,
            env.ports
                .state_store
                .update_state(&ctx.request.session_id, StepName::AcceptContract, step),
        )
        .await
        .map_err(|e| SagaError::state_update(StepName::AcceptContract.as_str(), e))
    })
}

fn attempt_lookup_error(err: ServiceError) -> SagaError {
    match err {
        ServiceError::NotFound { .. } => SagaError::ClientNotFound(err),
        other => SagaError::from_service(other, SagaError::AttemptStore),
    }
}

fn otp_error(err: ServiceError) -> SagaError {
    match err {
        ServiceError::Rejected { .. } => SagaError::OtpRejected(err),
        other => SagaError::from_service(other, SagaError::OtpDelivery),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_stage_order_and_criticality() {
        let stages = stages();
        let names: Vec<_> = stages.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                FETCH_STATE,
                CHECK_ATTEMPTS,
                VALIDATE_STEPS,
                ISSUE_OTP,
                PERSIST_ACCEPTANCE
            ]
        );
        assert!(stages.iter().all(StageDescriptor::is_critical));
    }

    #[test]
    fn test_attempt_lookup_error_mapping() {
        assert!(matches!(
            attempt_lookup_error(ServiceError::not_found("s", "c")),
            SagaError::ClientNotFound(_)
        ));
        assert!(matches!(
            attempt_lookup_error(ServiceError::unavailable("s", "down")),
            SagaError::AttemptStore(_)
        ));
        assert!(matches!(
            attempt_lookup_error(ServiceError::Timeout {
                operation: "x",
                after: Duration::from_millis(1)
            }),
            SagaError::Service(_)
        ));
    }

    #[test]
    fn test_otp_error_mapping() {
        assert!(matches!(
            otp_error(ServiceError::rejected("otp", "limit")),
            SagaError::OtpRejected(_)
        ));
        assert!(matches!(
            otp_error(ServiceError::unavailable("otp", "down")),
            SagaError::OtpDelivery(_)
        ));
    }
}
