//! Identity-verification attempt state and the decrement policy.

use common::ClientId;
use serde::{Deserialize, Serialize};

use crate::error::OnboardingError;

/// Blocking status of a client.
///
/// State transitions:
/// ```text
/// Active ──► Remaining ──► BlockedPermanent
///    └───────────────────────────┘
/// ```
/// There is no way back out of `BlockedPermanent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    /// No verification attempt has failed yet.
    #[default]
    Active,

    /// At least one attempt failed, some are left.
    Remaining,

    /// No attempts left (terminal state).
    BlockedPermanent,
}

impl ClientStatus {
    /// Returns true if this is the terminal blocked state.
    pub fn is_blocked(&self) -> bool {
        matches!(self, ClientStatus::BlockedPermanent)
    }

    /// Returns the status as stored by the attempt store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "ACTIVE",
            ClientStatus::Remaining => "REMAINING",
            ClientStatus::BlockedPermanent => "BLOCKED_PERMANENT",
        }
    }

    /// Status implied by a remaining-attempt count after a failure.
    pub fn after_failure(remaining: u32) -> Self {
        if remaining == 0 {
            ClientStatus::BlockedPermanent
        } else {
            ClientStatus::Remaining
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A client's remaining identity-verification attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAttemptState {
    pub client_id: ClientId,
    pub remaining_attempts_onb: u32,
    pub status: ClientStatus,
}

impl ClientAttemptState {
    /// Creates a state with the status implied by the count.
    pub fn new(client_id: ClientId, remaining_attempts_onb: u32) -> Self {
        let status = if remaining_attempts_onb == 0 {
            ClientStatus::BlockedPermanent
        } else {
            ClientStatus::Active
        };
        Self {
            client_id,
            remaining_attempts_onb,
            status,
        }
    }

    /// Returns true if the client cannot attempt verification again.
    ///
    /// Either half of the stored pair is enough to block, so a store that
    /// drifted out of sync never grants an extra attempt.
    pub fn is_blocked(&self) -> bool {
        self.remaining_attempts_onb == 0 || self.status.is_blocked()
    }
}

/// Result of consuming one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDecrement {
    pub client_id: ClientId,
    pub new_remaining: u32,
    pub new_status: ClientStatus,
}

impl AttemptDecrement {
    /// Returns the attempt state to persist.
    pub fn to_state(&self) -> ClientAttemptState {
        ClientAttemptState {
            client_id: self.client_id.clone(),
            remaining_attempts_onb: self.new_remaining,
            status: self.new_status,
        }
    }
}

/// Entry guard applied before any collaborator beyond the initial reads.
pub fn ensure_not_blocked(state: &ClientAttemptState) -> Result<(), OnboardingError> {
    if state.is_blocked() {
        return Err(OnboardingError::BlockedPermanently {
            client_id: state.client_id.clone(),
        });
    }
    Ok(())
}

/// Consumes one verification attempt.
///
/// Pure computation; persisting the result is the caller's job.
pub fn decrement(
    client_id: &ClientId,
    current_remaining: u32,
) -> Result<AttemptDecrement, OnboardingError> {
    let new_remaining =
        current_remaining
            .checked_sub(1)
            .ok_or_else(|| OnboardingError::BlockedPermanently {
                client_id: client_id.clone(),
            })?;

    Ok(AttemptDecrement {
        client_id: client_id.clone(),
        new_remaining,
        new_status: ClientStatus::after_failure(new_remaining),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientId {
        ClientId::new("client-1")
    }

    #[test]
    fn test_decrement_with_attempts_left() {
        for n in 2..10 {
            let result = decrement(&client(), n).unwrap();
            assert_eq!(result.new_remaining, n - 1);
            assert_eq!(result.new_status, ClientStatus::Remaining);
        }
    }

    #[test]
    fn test_decrement_last_attempt_blocks() {
        let result = decrement(&client(), 1).unwrap();
        assert_eq!(result.new_remaining, 0);
        assert_eq!(result.new_status, ClientStatus::BlockedPermanent);
        assert!(result.to_state().is_blocked());
    }

    #[test]
    fn test_decrement_at_zero_is_rejected() {
        let result = decrement(&client(), 0);
        assert!(matches!(
            result,
            Err(OnboardingError::BlockedPermanently { .. })
        ));
    }

    #[test]
    fn test_new_state_derives_status() {
        assert_eq!(
            ClientAttemptState::new(client(), 3).status,
            ClientStatus::Active
        );
        assert_eq!(
            ClientAttemptState::new(client(), 0).status,
            ClientStatus::BlockedPermanent
        );
    }

    #[test]
    fn test_entry_guard() {
        assert!(ensure_not_blocked(&ClientAttemptState::new(client(), 1)).is_ok());
        assert!(ensure_not_blocked(&ClientAttemptState::new(client(), 0)).is_err());

        let drifted = ClientAttemptState {
            client_id: client(),
            remaining_attempts_onb: 2,
            status: ClientStatus::BlockedPermanent,
        };
        assert!(ensure_not_blocked(&drifted).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ClientStatus::BlockedPermanent).unwrap();
        assert_eq!(json, "\"BLOCKED_PERMANENT\"");
        let back: ClientStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClientStatus::BlockedPermanent);
    }
}
