//! Orchestrator module - round-robin conversations over a shared transcript
//!
//! Teams are described by YAML templates and turned into a
//! [`ConversationRunner`]; several subjects can be run at once with
//! [`ConcurrentRuns`].
//!
//! # Example
//!
//! ```rust,ignore
//! use riskdesk::orchestrator::TeamConfig;
//!
//! let team = TeamConfig::from_file("templates/sovereign_risk.yaml")?;
//! let runner = team.runner(client, &registry, &settings)?;
//! let outcome = runner.run(&team.task_for("Argentina")).await?;
//! ```

pub mod concurrent;
pub mod config;
pub mod round_robin;

// Re-exports
pub use concurrent::{exit_code, ConcurrentRuns, PlannedRun, SubjectOutcome};
pub use config::{ParticipantConfig, TeamConfig, SUBJECT_PLACEHOLDER};
pub use round_robin::{ConversationRunner, RunHooks, RunOutcome, RunState, TerminationReason};
