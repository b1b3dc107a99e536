//! Onboarding session snapshot.

use std::collections::BTreeMap;

use common::SessionId;
use serde::{Deserialize, Serialize};

use crate::step::{StepName, StepResult};

/// A read-only snapshot of an onboarding session as returned by the state
/// store.
///
/// The saga never mutates a session in place; it asks the store for named
/// mutations and re-reads when it needs fresh data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSession {
    pub session_id: SessionId,
    #[serde(default)]
    pub steps: BTreeMap<StepName, StepResult>,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Business registration number (RUC).
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
}

impl OnboardingSession {
    /// Creates an empty session.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            steps: BTreeMap::new(),
            company_name: None,
            ruc: None,
            email: None,
            identification: None,
        }
    }

    /// Records a step result, replacing any previous entry.
    pub fn with_step(mut self, step: StepName, result: StepResult) -> Self {
        self.steps.insert(step, result);
        self
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_ruc(mut self, ruc: impl Into<String>) -> Self {
        self.ruc = Some(ruc.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_identification(mut self, identification: impl Into<String>) -> Self {
        self.identification = Some(identification.into());
        self
    }

    /// Returns the ledger entry for a step.
    pub fn step(&self, step: StepName) -> Option<&StepResult> {
        self.steps.get(&step)
    }

    /// Returns true if the step is present and succeeded.
    pub fn is_step_completed(&self, step: StepName) -> bool {
        self.step(step).is_some_and(StepResult::is_success)
    }

    /// Returns the email if present and non-blank.
    pub fn contact_email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    /// Returns the registration number, falling back to the personal
    /// identification number, if either is present and non-blank.
    pub fn registration_number(&self) -> Option<&str> {
        non_blank(self.ruc.as_deref()).or_else(|| non_blank(self.identification.as_deref()))
    }

    /// Returns the names of the minimum fields needed to sign that are
    /// missing from this session.
    pub fn missing_signing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.contact_email().is_none() {
            missing.push("email");
        }
        if self.registration_number().is_none() {
            missing.push("ruc");
        }
        missing
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
