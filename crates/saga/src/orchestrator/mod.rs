//! Saga orchestrator exposing the accept-contract and sign-contract
//! operations.

pub mod accept_contract;
pub mod sign_contract;

use std::sync::Arc;
use std::time::Instant;

use common::{SessionId, TrackingId};
use onboarding::{OnboardingSession, StepValidator};
use serde::{Deserialize, Serialize};

use crate::config::SagaConfig;
use crate::error::SagaError;
use crate::limiter::AttemptLimiter;
use crate::result::SagaResult;
use crate::services::{
    ClientAttemptStore, DocumentComposer, Notifier, OtpIssuer, SignatureInitiator, StateStore,
    TemplateRenderer,
};
use crate::stage::StageDriver;

/// Input of both saga operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaRequest {
    pub session_id: SessionId,
    pub device_id: String,
    pub identification: String,
    /// Node (merchant) the onboarding belongs to.
    pub node_id: String,
}

impl SagaRequest {
    pub fn new(
        session_id: impl Into<SessionId>,
        device_id: impl Into<String>,
        identification: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            device_id: device_id.into(),
            identification: identification.into(),
            node_id: node_id.into(),
        }
    }
}

/// The remote collaborators the saga calls.
#[derive(Clone)]
pub struct Collaborators {
    pub state_store: Arc<dyn StateStore>,
    pub attempts: Arc<dyn ClientAttemptStore>,
    pub otp: Arc<dyn OtpIssuer>,
    pub signature: Arc<dyn SignatureInitiator>,
    pub templates: Arc<dyn TemplateRenderer>,
    pub documents: Arc<dyn DocumentComposer>,
    pub notifier: Arc<dyn Notifier>,
}

/// Everything a stage may read. Shared by all concurrent invocations.
pub(crate) struct SagaEnv {
    pub(crate) ports: Collaborators,
    pub(crate) config: SagaConfig,
    pub(crate) limiter: AttemptLimiter,
    pub(crate) validator: StepValidator,
}

/// Runs the onboarding contract sagas.
///
/// The orchestrator holds no per-request state: each call builds its own
/// context and stage list, so one instance can be shared across tasks.
pub struct SagaOrchestrator {
    env: SagaEnv,
    driver: StageDriver,
}

impl SagaOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(ports: Collaborators, config: SagaConfig) -> Self {
        let limiter = AttemptLimiter::new(ports.attempts.clone(), config.call_timeout);
        let driver = StageDriver::new(config.best_effort_max_attempts);
        Self {
            env: SagaEnv {
                ports,
                config,
                limiter,
                validator: StepValidator::for_accept_contract(),
            },
            driver,
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &SagaConfig {
        &self.env.config
    }

    /// Validates the onboarding steps and issues the OTP that confirms
    /// contract acceptance.
    #[tracing::instrument(
        skip(self, request),
        fields(
            operation = accept_contract::OPERATION,
            session_id = %request.session_id,
            tracking_id = tracing::field::Empty,
        )
    )]
    pub async fn accept_contract_step(&self, request: SagaRequest) -> SagaResult {
        let started = Instant::now();
        let tracking_id = begin(accept_contract::OPERATION);

        let mut ctx = accept_contract::AcceptContractContext::new(request, tracking_id);
        let stages = accept_contract::stages();
        let report = self.driver.run(&self.env, &mut ctx, &stages).await;
        let result = accept_contract::finish(ctx, report);

        record(accept_contract::OPERATION, &result, started);
        result
    }

    /// Completes the onboarding: starts the signature, closes the session
    /// and sends the contract documents.
    #[tracing::instrument(
        skip(self, request),
        fields(
            operation = sign_contract::OPERATION,
            session_id = %request.session_id,
            tracking_id = tracing::field::Empty,
        )
    )]
    pub async fn sign_contract_step(&self, request: SagaRequest) -> SagaResult {
        let started = Instant::now();
        let tracking_id = begin(sign_contract::OPERATION);

        let mut ctx = sign_contract::SignContractContext::new(request, tracking_id);
        let stages = sign_contract::stages();
        let report = self.driver.run(&self.env, &mut ctx, &stages).await;
        let result = sign_contract::finish(ctx, report);

        record(sign_contract::OPERATION, &result, started);
        result
    }
}

impl std::fmt::Debug for SagaOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaOrchestrator")
            .field("config", &self.env.config)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

fn begin(operation: &'static str) -> TrackingId {
    let tracking_id = TrackingId::new();
    tracing::Span::current().record("tracking_id", tracing::field::display(tracking_id));
    metrics::counter!("onboarding_saga_executions_total", "operation" => operation).increment(1);
    tracing::debug!("saga started");
    tracking_id
}

fn record(operation: &'static str, result: &SagaResult, started: Instant) {
    let duration = started.elapsed().as_secs_f64();
    metrics::histogram!("onboarding_saga_duration_seconds", "operation" => operation)
        .record(duration);

    match result.error_code {
        None => {
            metrics::counter!("onboarding_saga_completed_total", "operation" => operation)
                .increment(1);
            tracing::info!(duration, "saga completed successfully");
        }
        Some(code) => {
            metrics::counter!(
                "onboarding_saga_failed_total",
                "operation" => operation,
                "code" => code.as_str()
            )
            .increment(1);
            tracing::info!(duration, code = %code, "saga finished with error");
        }
    }
}

/// Returns the loaded session or an internal error if a stage ran out of
/// order.
pub(crate) fn loaded(session: Option<&OnboardingSession>) -> Result<&OnboardingSession, SagaError> {
    session.ok_or_else(|| SagaError::missing_context("onboarding session"))
}
