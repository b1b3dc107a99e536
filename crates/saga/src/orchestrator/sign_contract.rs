//! Sign-contract saga: start the electronic signature, close the session,
//! then deliver the contract documents by email.
//!
//! Only loading the session, checking the signing data and closing the
//! session are critical. Signature, documents and notification are
//! best-effort: their failures are logged and the saga still succeeds.

use common::{SessionId, TrackingId};
use onboarding::{OnboardingSession, StepName, StepResult};
use serde_json::{Value, json};

use super::{SagaEnv, SagaRequest, loaded};
use crate::config::SagaConfig;
use crate::error::{SagaError, ServiceError};
use crate::result::{SagaOutput, SagaResult, SignOutcome};
use crate::services::{Attachment, DocumentRequest, EmailMessage, SignatureRequest, timed};
use crate::stage::{DriverReport, StageContext, StageDescriptor, StageFuture};

pub(crate) const OPERATION: &str = "sign_contract";

pub const FETCH_ONBOARDING: &str = "fetch-onboarding";
/// Checks the minimum fields needed to sign.
pub const REQUIRE_DATA: &str = "require-data";
pub const START_SIGNATURE: &str = "start-signature";
/// Records the signature and marks the onboarding completed.
pub const COMPLETE_SESSION: &str = "complete-session";
/// Renders and generates the contract document.
pub const COMPOSE_CONTRACT: &str = "compose-contract";
pub const COMPOSE_BILLING: &str = "compose-billing";
pub const NOTIFY: &str = "notify";

/// Documents delivered with the completion email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Contract,
    Billing,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::Contract => "contract",
            DocumentKind::Billing => "billing",
        }
    }

    fn template(self, config: &SagaConfig) -> &str {
        match self {
            DocumentKind::Contract => &config.contract_template,
            DocumentKind::Billing => &config.billing_template,
        }
    }

    fn description(self) -> &'static str {
        match self {
            DocumentKind::Contract => "Merchant services contract",
            DocumentKind::Billing => "Billing authorization",
        }
    }

    fn file_name(self, registration_number: &str) -> String {
        format!("{}-{registration_number}.pdf", self.label())
    }
}

pub(crate) struct SignContractContext {
    request: SagaRequest,
    tracking_id: TrackingId,
    session: Option<OnboardingSession>,
    /// Data recorded by the OTP validation step, if any.
    otp_completion: Value,
    reference_transaction: Option<String>,
    attachments: Vec<Attachment>,
}

impl SignContractContext {
    pub(crate) fn new(request: SagaRequest, tracking_id: TrackingId) -> Self {
        Self {
            request,
            tracking_id,
            session: None,
            otp_completion: Value::Null,
            reference_transaction: None,
            attachments: Vec::new(),
        }
    }
}

impl StageContext for SignContractContext {
    fn session_id(&self) -> &SessionId {
        &self.request.session_id
    }

    fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }
}

pub(crate) fn stages() -> Vec<StageDescriptor<SagaEnv, SignContractContext>> {
    vec![
        StageDescriptor::critical(FETCH_ONBOARDING, fetch_onboarding),
        StageDescriptor::critical(REQUIRE_DATA, require_data),
        StageDescriptor::best_effort(START_SIGNATURE, start_signature),
        StageDescriptor::critical(COMPLETE_SESSION, complete_session),
        StageDescriptor::best_effort(COMPOSE_CONTRACT, compose_contract),
        StageDescriptor::best_effort(COMPOSE_BILLING, compose_billing),
        StageDescriptor::best_effort(NOTIFY, notify),
    ]
}

pub(crate) fn finish(ctx: SignContractContext, report: DriverReport) -> SagaResult {
    let DriverReport { stages, failure } = report;
    if let Some(err) = failure {
        return SagaResult::failure(ctx.tracking_id, &err, stages);
    }

    let outcome = SignOutcome {
        reference_transaction: ctx.reference_transaction,
        attachments: ctx.attachments.into_iter().map(|a| a.file_name).collect(),
    };
    SagaResult::success(ctx.tracking_id, SagaOutput::Signed(outcome), stages)
}

fn fetch_onboarding<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let session = timed(
            "state_store.get_state",
            env.config.call_timeout,
            env.ports.state_store.get_state(&ctx.request.session_id),
        )
        .await
        .map_err(|e| SagaError::from_service(e, SagaError::SessionFetch))?;

        ctx.otp_completion = session
            .step(StepName::ValidateOtp)
            .map(|step| step.data.clone())
            .unwrap_or(Value::Null);
        ctx.session = Some(session);
        Ok(())
    })
}

fn require_data<'a>(_env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let missing = loaded(ctx.session.as_ref())?.missing_signing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SagaError::DataIncomplete { missing })
        }
    })
}

fn start_signature<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        ctx.reference_transaction = None;
        let session = loaded(ctx.session.as_ref())?;
        let request = SignatureRequest {
            session_id: ctx.request.session_id.clone(),
            tracking_id: ctx.tracking_id,
            node_id: ctx.request.node_id.clone(),
            identification: ctx.request.identification.clone(),
            email: session.contact_email().unwrap_or_default().to_string(),
            company_name: session.company_name.clone(),
        };

        let started = timed(
            "signature_initiator.start",
            env.config.call_timeout,
            env.ports.signature.start(request),
        )
        .await
        .map_err(|e| SagaError::from_service(e, SagaError::Signature))?;

        tracing::debug!(
            reference_transaction = %started.reference_transaction,
            status = %started.status,
            "signature started"
        );
        ctx.reference_transaction = Some(started.reference_transaction);
        Ok(())
    })
}

fn complete_session<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let step = StepResult::success().with_data(json!({
            "referenceTransaction": ctx.reference_transaction,
            "trackingId": ctx.tracking_id,
            "otpValidation": ctx.otp_completion,
        }));
        let timeout = env.config.call_timeout;
        let state_store = &env.ports.state_store;
        let step_name = StepName::SignContract;

        timed(
            "state_store.update_state",
            timeout,
            state_store.update_state(&ctx.request.session_id, step_name, step),
        )
        .await
        .map_err(|e| SagaError::state_update(step_name.as_str(), e))?;

        timed(
            "state_store.complete_session",
            timeout,
            state_store.complete_session(&ctx.request.session_id),
        )
        .await
        .map_err(|e| SagaError::state_update(step_name.as_str(), e))
    })
}

fn compose_contract<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(compose_document(env, ctx, DocumentKind::Contract))
}

fn compose_billing<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(compose_document(env, ctx, DocumentKind::Billing))
}

/// Produces one document. Attachments are kept only when generation
/// succeeds.
async fn compose_document(
    env: &SagaEnv,
    ctx: &mut SignContractContext,
    kind: DocumentKind,
) -> Result<(), SagaError> {
    let session = loaded(ctx.session.as_ref())?;
    let registration_number = session.registration_number().unwrap_or_default();
    let data = json!({
        "companyName": session.company_name,
        "ruc": registration_number,
        "email": session.contact_email(),
        "identification": ctx.request.identification,
        "referenceTransaction": ctx.reference_transaction,
    });

    let mut attachments = compose(env, &ctx.request, kind, registration_number, &data).await?;
    ctx.attachments.append(&mut attachments);
    Ok(())
}

async fn compose(
    env: &SagaEnv,
    request: &SagaRequest,
    kind: DocumentKind,
    registration_number: &str,
    data: &Value,
) -> Result<Vec<Attachment>, SagaError> {
    let timeout = env.config.call_timeout;

    let html = timed(
        "template_renderer.render",
        timeout,
        env.ports
            .templates
            .render(kind.template(&env.config), &env.config.template_path, data),
    )
    .await
    .map_err(|e| SagaError::document(kind.label(), e))?;

    if html.is_empty() {
        return Err(SagaError::document(
            kind.label(),
            ServiceError::rejected("template_renderer", "template produced no content"),
        ));
    }

    let composed = timed(
        "document_composer.generate",
        timeout,
        env.ports.documents.generate(DocumentRequest {
            commerce_id: request.node_id.clone(),
            identification: request.identification.clone(),
            html,
            file_name: kind.file_name(registration_number),
            description: kind.description().to_string(),
        }),
    )
    .await
    .map_err(|e| SagaError::document(kind.label(), e))?;

    Ok(composed.attachments)
}

fn notify<'a>(env: &'a SagaEnv, ctx: &'a mut SignContractContext) -> StageFuture<'a> {
    Box::pin(async move {
        let session = loaded(ctx.session.as_ref())?;
        let to = session
            .contact_email()
            .ok_or_else(|| SagaError::DataIncomplete {
                missing: vec!["email"],
            })?;
        let company = session.company_name.as_deref().unwrap_or("your company");

        let message = EmailMessage {
            to: to.to_string(),
            subject: env.config.notification_subject.clone(),
            body: format!(
                "Onboarding for {company} is complete. Your signed documents are attached."
            ),
            attachments: ctx.attachments.clone(),
        };

        timed(
            "notifier.send_email",
            env.config.call_timeout,
            env.ports.notifier.send_email(message),
        )
        .await
        .map_err(|e| SagaError::from_service(e, SagaError::Notification))
    })
}
