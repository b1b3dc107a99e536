//! Onboarding contract sagas.
//!
//! Two operations complete a merchant onboarding:
//! 1. Accept contract: validate the onboarding steps, consume an attempt on
//!    failed identity verification, issue the acceptance OTP
//! 2. Sign contract: start the electronic signature, close the session,
//!    deliver the contract documents
//!
//! Each operation is a list of stages run by the [`StageDriver`]. Critical
//! stage failures end the saga with a classified error; best-effort failures
//! are logged and the saga continues.

pub mod classifier;
pub mod config;
pub mod error;
pub mod limiter;
pub mod orchestrator;
pub mod result;
pub mod services;
pub mod stage;
pub mod telemetry;

pub use classifier::{ClassifiedError, ErrorCode, classify};
pub use config::SagaConfig;
pub use error::{SagaError, ServiceError};
pub use limiter::{AttemptLimiter, LimiterOutcome};
pub use orchestrator::{Collaborators, SagaOrchestrator, SagaRequest};
pub use result::{
    OtpMetadata, SagaOutput, SagaResult, SagaStatus, SignOutcome, StageLedger, StageOutcome,
    StageRecord,
};
pub use services::{
    Attachment, ClientAttemptStore, DocumentComposer, EmailMessage, InMemoryClientAttemptStore,
    InMemoryDocumentComposer, InMemoryNotifier, InMemoryOtpIssuer, InMemorySignatureInitiator,
    InMemoryStateStore, InMemoryTemplateRenderer, Notifier, OtpIssuer, SignatureInitiator,
    StateStore, TemplateRenderer,
};
pub use stage::{Criticality, DriverReport, StageContext, StageDescriptor, StageDriver};
pub use telemetry::init_tracing;
