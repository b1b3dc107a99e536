//! Stage descriptors and the driver loop that executes them.
//!
//! A saga operation is an ordered list of [`StageDescriptor`]s. The
//! [`StageDriver`] runs them in order against a request-scoped context:
//! - a critical stage failure stops the run and becomes the terminal error
//! - a best-effort stage failure is logged with the correlation IDs and the
//!   run continues
//!
//! Stages never share state except through the context value, so one
//! orchestrator can serve concurrent requests.

use common::{SessionId, TrackingId};
use futures_util::future::BoxFuture;

use crate::error::SagaError;
use crate::result::{StageLedger, StageOutcome};

/// Whether a stage failure aborts the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criticality {
    Critical,
    BestEffort,
}

impl Criticality {
    /// Returns the criticality as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Critical => "critical",
            Criticality::BestEffort => "best_effort",
        }
    }
}

/// Future returned by a stage.
pub type StageFuture<'a> = BoxFuture<'a, Result<(), SagaError>>;

/// A stage body: reads shared dependencies, reads and writes the context.
pub type StageFn<D, C> = for<'a> fn(&'a D, &'a mut C) -> StageFuture<'a>;

/// One named step of a saga operation.
pub struct StageDescriptor<D, C> {
    pub name: &'static str,
    pub criticality: Criticality,
    pub run: StageFn<D, C>,
}

impl<D, C> StageDescriptor<D, C> {
    /// Creates a stage whose failure aborts the saga.
    pub fn critical(name: &'static str, run: StageFn<D, C>) -> Self {
        Self {
            name,
            criticality: Criticality::Critical,
            run,
        }
    }

    /// Creates a stage whose failure is logged and absorbed.
    pub fn best_effort(name: &'static str, run: StageFn<D, C>) -> Self {
        Self {
            name,
            criticality: Criticality::BestEffort,
            run,
        }
    }

    /// Returns true if a failure of this stage aborts the saga.
    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }
}

impl<D, C> std::fmt::Debug for StageDescriptor<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("criticality", &self.criticality)
            .finish_non_exhaustive()
    }
}

/// Correlation identifiers every stage context exposes for logging.
pub trait StageContext {
    fn session_id(&self) -> &SessionId;
    fn tracking_id(&self) -> TrackingId;
}

/// Outcome of running a stage list.
#[derive(Debug)]
pub struct DriverReport {
    /// Per-stage outcomes; stages after a critical failure stay pending.
    pub stages: StageLedger,
    /// The critical failure that stopped the run, if any.
    pub failure: Option<SagaError>,
}

impl DriverReport {
    /// Returns true if every critical stage succeeded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs stage lists.
#[derive(Debug, Clone, Copy)]
pub struct StageDriver {
    best_effort_max_attempts: u32,
}

impl StageDriver {
    /// Creates a driver. Best-effort stages are tried up to
    /// `best_effort_max_attempts` times (at least once); critical stages
    /// are tried exactly once.
    pub fn new(best_effort_max_attempts: u32) -> Self {
        Self {
            best_effort_max_attempts: best_effort_max_attempts.max(1),
        }
    }

    fn attempts_for(&self, criticality: Criticality) -> u32 {
        match criticality {
            Criticality::Critical => 1,
            Criticality::BestEffort => self.best_effort_max_attempts,
        }
    }

    /// Runs the stages in order.
    pub async fn run<D, C>(
        &self,
        deps: &D,
        ctx: &mut C,
        stages: &[StageDescriptor<D, C>],
    ) -> DriverReport
    where
        D: Sync,
        C: StageContext + Send,
    {
        let mut ledger = StageLedger::pending(stages.iter().map(|s| s.name));

        for stage in stages {
            tracing::debug!(
                stage = stage.name,
                criticality = stage.criticality.as_str(),
                "stage started"
            );

            let max_attempts = self.attempts_for(stage.criticality);
            let mut attempt = 1;
            let outcome = loop {
                match (stage.run)(deps, ctx).await {
                    Ok(()) => break Ok(()),
                    Err(err) if attempt < max_attempts => {
                        tracing::debug!(
                            stage = stage.name,
                            attempt,
                            error = %err,
                            "best-effort stage failed, retrying"
                        );
                        attempt += 1;
                    }
                    Err(err) => break Err(err),
                }
            };

            let err = match outcome {
                Ok(()) => {
                    ledger.mark(stage.name, StageOutcome::Success);
                    continue;
                }
                Err(err) => err,
            };

            ledger.mark(stage.name, StageOutcome::Fail);
            metrics::counter!(
                "onboarding_saga_stage_failures_total",
                "stage" => stage.name,
                "criticality" => stage.criticality.as_str()
            )
            .increment(1);

            match stage.criticality {
                Criticality::Critical => {
                    tracing::warn!(
                        session_id = %ctx.session_id(),
                        tracking_id = %ctx.tracking_id(),
                        stage = stage.name,
                        error = %err,
                        "critical stage failed, aborting saga"
                    );
                    return DriverReport {
                        stages: ledger,
                        failure: Some(err),
                    };
                }
                Criticality::BestEffort => {
                    tracing::warn!(
                        session_id = %ctx.session_id(),
                        tracking_id = %ctx.tracking_id(),
                        stage = stage.name,
                        attempts = attempt,
                        error = %err,
                        "best-effort stage failed, continuing"
                    );
                }
            }
        }

        DriverReport {
            stages: ledger,
            failure: None,
        }
    }
}

impl Default for StageDriver {
    fn default() -> Self {
        Self::new(1)
    }
}
