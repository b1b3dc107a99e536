//! Shared identifier types for the onboarding saga workspace.

mod types;

pub use types::{ClientId, SessionId, TrackingId};
