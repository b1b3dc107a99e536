//! Onboarding domain for the contract saga.
//!
//! This crate holds the pure side of the onboarding workflow:
//! - the session step ledger keyed by [`StepName`]
//! - client attempt state and the decrement policy
//! - [`StepValidator`], which checks a ledger against an ordered list of
//!   required steps
//!
//! Nothing here performs I/O. The `saga` crate decides what to persist based
//! on the values returned from this crate.

pub mod attempts;
pub mod error;
pub mod session;
pub mod step;
pub mod validator;

pub use attempts::{
    AttemptDecrement, ClientAttemptState, ClientStatus, decrement, ensure_not_blocked,
};
pub use error::OnboardingError;
pub use session::OnboardingSession;
pub use step::{StepName, StepResult, StepStatus, VerificationOutcome};
pub use validator::{ACCEPT_CONTRACT_REQUIRED_STEPS, StepValidator, ValidationOutcome};
