//! Round-robin conversation runner
//!
//! Participants speak in a fixed cyclic order over a shared transcript until
//! a message carries the termination sentinel, the turn budget is spent, or
//! the run is cancelled.

use crate::error::{Error, Result};
use crate::participant::TurnTaker;
use crate::termination::TerminationDetector;
use crate::transcript::{Message, Transcript};
use crate::types::{RunId, TokenUsage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The most recent message contained the sentinel
    SentinelMatched,
    /// `max_turns` messages were produced without the sentinel
    TurnBudgetExhausted,
    /// The shutdown channel fired
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SentinelMatched => "sentinel matched",
            Self::TurnBudgetExhausted => "turn budget exhausted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Runner state; `Terminated` is final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Another turn will be taken
    Running,
    /// No further turns
    Terminated(TerminationReason),
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier
    pub run_id: RunId,
    /// Every message produced
    pub transcript: Transcript,
    /// Why the run stopped
    pub reason: TerminationReason,
    /// Tokens spent across all turns
    pub usage: TokenUsage,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Whether the conversation ended on its own terms
    pub fn is_complete(&self) -> bool {
        self.reason == TerminationReason::SentinelMatched
    }
}

/// Observers invoked as the run progresses
#[derive(Clone, Default)]
pub struct RunHooks {
    /// Hook called after each message is appended
    pub on_message: Option<Arc<dyn Fn(&Message) -> Result<()> + Send + Sync>>,
    /// Hook called once the run terminates
    pub on_terminated: Option<Arc<dyn Fn(&RunOutcome) -> Result<()> + Send + Sync>>,
}

impl RunHooks {
    fn message(&self, message: &Message) {
        if let Some(hook) = &self.on_message {
            if let Err(e) = hook(message) {
                tracing::warn!(sequence = message.sequence, error = %e, "on_message hook failed");
            }
        }
    }

    fn terminated(&self, outcome: &RunOutcome) {
        if let Some(hook) = &self.on_terminated {
            if let Err(e) = hook(outcome) {
                tracing::warn!(run_id = %outcome.run_id, error = %e, "on_terminated hook failed");
            }
        }
    }
}

impl std::fmt::Debug for RunHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHooks")
            .field("on_message", &self.on_message.is_some())
            .field("on_terminated", &self.on_terminated.is_some())
            .finish()
    }
}

/// Drives participants in round-robin order over one transcript per run
pub struct ConversationRunner {
    participants: Vec<Arc<dyn TurnTaker>>,
    detector: TerminationDetector,
    max_turns: u32,
    hooks: RunHooks,
}

impl ConversationRunner {
    /// Create a runner; needs at least one participant and one turn
    pub fn new(
        participants: Vec<Arc<dyn TurnTaker>>,
        detector: TerminationDetector,
        max_turns: u32,
    ) -> Result<Self> {
        if participants.is_empty() {
            return Err(Error::config("a conversation needs at least one participant"));
        }
        if max_turns == 0 {
            return Err(Error::config("max_turns must be at least 1"));
        }
        Ok(Self {
            participants,
            detector,
            max_turns,
            hooks: RunHooks::default(),
        })
    }

    /// Attach observers
    pub fn with_hooks(mut self, hooks: RunHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Participants in speaking order
    pub fn participants(&self) -> &[Arc<dyn TurnTaker>] {
        &self.participants
    }

    /// Turn budget
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Run to completion without external cancellation
    pub async fn run(&self, task: &str) -> Result<RunOutcome> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_until(task, shutdown_rx).await
    }

    /// Run until termination or until `shutdown` turns true
    ///
    /// A participant failure aborts the run and is returned as is.
    pub async fn run_until(
        &self,
        task: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let run_id = RunId::new();
        let mut transcript = Transcript::new(run_id, task);

        tracing::info!(
            %run_id,
            participants = self.participants.len(),
            max_turns = self.max_turns,
            "conversation started"
        );

        let mut state = RunState::Running;
        while state == RunState::Running {
            if *shutdown.borrow() {
                state = RunState::Terminated(TerminationReason::Cancelled);
                break;
            }

            let participant = &self.participants[transcript.len() % self.participants.len()];
            let turn = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => None,
                result = participant.take_turn(&transcript) => Some(result),
            };

            let output = match turn {
                None => {
                    tracing::info!(%run_id, participant = %participant.id(), "turn dropped on shutdown");
                    state = RunState::Terminated(TerminationReason::Cancelled);
                    break;
                }
                Some(Err(e)) => {
                    tracing::error!(%run_id, participant = %participant.id(), error = %e, "conversation aborted");
                    return Err(e);
                }
                Some(Ok(output)) => output,
            };

            let message = transcript.append(participant.id().clone(), output);
            tracing::info!(
                %run_id,
                sequence = message.sequence,
                sender = %message.sender,
                tool_calls = message.tool_invocations.len(),
                "message appended"
            );
            self.hooks.message(message);
            state = self.evaluate(&transcript);
        }

        let reason = match state {
            RunState::Terminated(reason) => reason,
            RunState::Running => TerminationReason::Cancelled,
        };
        let outcome = RunOutcome {
            run_id,
            usage: transcript.usage(),
            transcript,
            reason,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            %run_id,
            %reason,
            messages = outcome.transcript.len(),
            total_tokens = outcome.usage.total_tokens,
            "conversation terminated"
        );
        self.hooks.terminated(&outcome);
        Ok(outcome)
    }

    /// Next state after a message was appended; the sentinel wins over the budget
    fn evaluate(&self, transcript: &Transcript) -> RunState {
        match transcript.last() {
            Some(last) if self.detector.is_terminal(last) => {
                RunState::Terminated(TerminationReason::SentinelMatched)
            }
            _ if transcript.len() >= self.max_turns as usize => {
                RunState::Terminated(TerminationReason::TurnBudgetExhausted)
            }
            _ => RunState::Running,
        }
    }
}

impl std::fmt::Debug for ConversationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRunner")
            .field(
                "participants",
                &self.participants.iter().map(|p| p.id().as_str()).collect::<Vec<_>>(),
            )
            .field("sentinel", &self.detector.sentinel())
            .field("max_turns", &self.max_turns)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
