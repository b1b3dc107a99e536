//! Translation of saga failures into user-facing error codes.

use onboarding::OnboardingError;
use serde::{Deserialize, Serialize};

use crate::error::{SagaError, ServiceError};

/// User-facing error codes returned in a [`crate::SagaResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    OnbStepInvalid,
    OnbValidateDocumentIdPending,
    OnbValidateIdentityIdFailed,
    OnbBlockedPermanently,
    OnbDataIncomplete,
    OnbGetSessionFail,
    OnbStatusInvalid,
    AuthOtpInvalid,
    NotifSendFailed,
    CnbServiceError,
    CnbClientNotFound,
    DocSignFailed,
    SysTimeoutExceeded,
    SysServiceDown,
    SysErrorUnknown,
}

impl ErrorCode {
    /// Returns the code as sent to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::OnbStepInvalid => "ONB_STEP_INVALID",
            ErrorCode::OnbValidateDocumentIdPending => "ONB_VALIDATE_DOCUMENT_ID_PENDING",
            ErrorCode::OnbValidateIdentityIdFailed => "ONB_VALIDATE_IDENTITY_ID_FAILED",
            ErrorCode::OnbBlockedPermanently => "ONB_BLOCKED_PERMANENTLY",
            ErrorCode::OnbDataIncomplete => "ONB_DATA_INCOMPLETE",
            ErrorCode::OnbGetSessionFail => "ONB_GET_SESSION_FAIL",
            ErrorCode::OnbStatusInvalid => "ONB_STATUS_INVALID",
            ErrorCode::AuthOtpInvalid => "AUTH_OTP_INVALID",
            ErrorCode::NotifSendFailed => "NOTIF_SEND_FAILED",
            ErrorCode::CnbServiceError => "CNB_SERVICE_ERROR",
            ErrorCode::CnbClientNotFound => "CNB_CLIENT_NOT_FOUND",
            ErrorCode::DocSignFailed => "DOC_SIGN_FAILED",
            ErrorCode::SysTimeoutExceeded => "SYS_TIMEOUT_EXCEEDED",
            ErrorCode::SysServiceDown => "SYS_SERVICE_DOWN",
            ErrorCode::SysErrorUnknown => "SYS_ERROR_UNKNOWN",
        }
    }

    /// Returns the message shown when no more specific one applies.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::OnbStepInvalid => "A required onboarding step is missing or incomplete",
            ErrorCode::OnbValidateDocumentIdPending => "Identity verification is still pending",
            ErrorCode::OnbValidateIdentityIdFailed => "Identity verification failed",
            ErrorCode::OnbBlockedPermanently => "Client is permanently blocked",
            ErrorCode::OnbDataIncomplete => "Required onboarding data not found",
            ErrorCode::OnbGetSessionFail => "Failed to get onboarding session",
            ErrorCode::OnbStatusInvalid => "Failed to update onboarding state",
            ErrorCode::AuthOtpInvalid => "OTP could not be generated",
            ErrorCode::NotifSendFailed => "Notification could not be sent",
            ErrorCode::CnbServiceError => "Client service error",
            ErrorCode::CnbClientNotFound => "Client not found",
            ErrorCode::DocSignFailed => "Document signing failed",
            ErrorCode::SysTimeoutExceeded => "The operation timed out",
            ErrorCode::SysServiceDown => "A required service is unavailable",
            ErrorCode::SysErrorUnknown => "An unexpected error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified failure: the code plus the message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub code: ErrorCode,
    pub message: String,
}

impl ClassifiedError {
    fn with_default_message(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }
}

/// Maps a saga failure to its error code and user-facing message.
///
/// Domain rejections keep their own message, which names the offending
/// step. Collaborator failures use the code's default message so internal
/// details stay in the logs.
pub fn classify(err: &SagaError) -> ClassifiedError {
    let code = match err {
        SagaError::Onboarding(domain) => {
            let code = match domain {
                OnboardingError::StepInvalid { .. } => ErrorCode::OnbStepInvalid,
                OnboardingError::DocumentIdPending { .. } => {
                    ErrorCode::OnbValidateDocumentIdPending
                }
                OnboardingError::IdentityFailed { .. } => ErrorCode::OnbValidateIdentityIdFailed,
                OnboardingError::BlockedPermanently { .. } => ErrorCode::OnbBlockedPermanently,
            };
            return ClassifiedError {
                code,
                message: domain.to_string(),
            };
        }
        SagaError::DataIncomplete { .. } => ErrorCode::OnbDataIncomplete,
        SagaError::SessionFetch(_) => ErrorCode::OnbGetSessionFail,
        SagaError::StateUpdate { .. } => ErrorCode::OnbStatusInvalid,
        SagaError::OtpRejected(_) => ErrorCode::AuthOtpInvalid,
        SagaError::OtpDelivery(_) | SagaError::Notification(_) => ErrorCode::NotifSendFailed,
        SagaError::ClientNotFound(_) => ErrorCode::CnbClientNotFound,
        SagaError::AttemptStore(_) => ErrorCode::CnbServiceError,
        SagaError::Signature(_) | SagaError::Document { .. } => ErrorCode::DocSignFailed,
        SagaError::Service(service) => match service {
            ServiceError::Timeout { .. } => ErrorCode::SysTimeoutExceeded,
            ServiceError::Unavailable { .. } => ErrorCode::SysServiceDown,
            ServiceError::NotFound { .. } | ServiceError::Rejected { .. } => {
                ErrorCode::SysErrorUnknown
            }
        },
        SagaError::Unexpected(_) => ErrorCode::SysErrorUnknown,
    };
    ClassifiedError::with_default_message(code)
}
