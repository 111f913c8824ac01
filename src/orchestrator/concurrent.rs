//! Independent runs executed in parallel
//!
//! Each subject gets its own runner and transcript; runs share only the
//! clients behind their participants and the shutdown signal.

use crate::error::Result;
use crate::orchestrator::round_robin::{ConversationRunner, RunOutcome, TerminationReason};
use futures::future::join_all;
use tokio::sync::watch;

/// One conversation waiting to be executed
#[derive(Debug)]
pub struct PlannedRun {
    /// Subject the run reports on (e.g. a country)
    pub subject: String,
    /// Opening task text
    pub task: String,
    /// Runner configured for this subject
    pub runner: ConversationRunner,
}

/// Result of one planned run
#[derive(Debug)]
pub struct SubjectOutcome {
    /// Subject the run reported on
    pub subject: String,
    /// Finished run or the error that aborted it
    pub result: Result<RunOutcome>,
}

impl SubjectOutcome {
    /// Termination reason, if the run finished
    pub fn reason(&self) -> Option<TerminationReason> {
        self.result.as_ref().ok().map(|outcome| outcome.reason)
    }
}

/// Process exit status for a batch
///
/// 1 if any run failed, 130 if any was cancelled, 2 if any ran out of turns,
/// 0 when every run ended on the sentinel.
pub fn exit_code(outcomes: &[SubjectOutcome]) -> i32 {
    let reasons: Vec<Option<TerminationReason>> = outcomes.iter().map(|o| o.reason()).collect();
    if reasons.iter().any(Option::is_none) {
        1
    } else if reasons.contains(&Some(TerminationReason::Cancelled)) {
        130
    } else if reasons.contains(&Some(TerminationReason::TurnBudgetExhausted)) {
        2
    } else {
        0
    }
}

/// Executes several runs at once
#[derive(Debug, Default)]
pub struct ConcurrentRuns {
    runs: Vec<PlannedRun>,
}

impl ConcurrentRuns {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run to the batch
    pub fn with_run(mut self, run: PlannedRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Number of runs in the batch
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Execute every run, returning outcomes in submission order
    pub async fn execute(self, shutdown: watch::Receiver<bool>) -> Vec<SubjectOutcome> {
        let futures: Vec<_> = self
            .runs
            .into_iter()
            .map(|run| {
                let shutdown = shutdown.clone();
                async move {
                    let result = run.runner.run_until(&run.task, shutdown).await;
                    if let Err(e) = &result {
                        tracing::warn!(subject = %run.subject, error = %e, "run failed");
                    }
                    SubjectOutcome {
                        subject: run.subject,
                        result,
                    }
                }
            })
            .collect();

        join_all(futures).await
    }
}
