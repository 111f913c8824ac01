//! # riskdesk
//!
//! A round-robin research desk: LLM-backed participants take turns over a
//! shared transcript, researchers call a country search tool, and a
//! synthesizer ends the conversation by emitting a sentinel once its report
//! is complete.
//!
//! ## Features
//!
//! - **Round-robin runner**: strict cyclic turn order with sentinel, budget and
//!   cancellation termination
//! - **Country search**: rate-limited search with citations, exposed as a
//!   function-calling tool
//! - **YAML teams**: participants, prompts, tools and budgets in a template
//! - **Concurrent subjects**: one independent run per country
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use riskdesk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let desk = Desk::new(
//!         TeamConfig::builtin()?,
//!         Settings::load(None)?,
//!         Credentials::from_env()?,
//!     )?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let outcomes = desk
//!         .plan(&["Argentina".to_string()], |_| RunHooks::default())?
//!         .execute(shutdown_rx)
//!         .await;
//!
//!     for outcome in &outcomes {
//!         println!("{}", riskdesk::console::render_status(outcome));
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod console;
pub mod desk;
pub mod error;
pub mod llm_client;
pub mod openrouter;
pub mod orchestrator;
pub mod participant;
pub mod search;
pub mod termination;
pub mod tools;
pub mod tracing_ext;
pub mod transcript;
pub mod types;

// Re-exports for convenience
pub use config::{ModelConfig, OpenRouterConfig, RecencyFilter, SearchConfig, Settings};
pub use desk::{Credentials, Desk};
pub use error::{Error, Result};
pub use llm_client::LlmClient;
pub use openrouter::{CompletionRequest, CompletionResponse, OpenRouterClient};
pub use orchestrator::{
    ConcurrentRuns, ConversationRunner, RunHooks, RunOutcome, TeamConfig, TerminationReason,
};
pub use participant::{Participant, ParticipantBuilder, TurnTaker};
pub use search::{CountrySearchTool, SearchClient, SearchRecord};
pub use termination::{TerminationDetector, DEFAULT_SENTINEL};
pub use tools::{Tool, ToolContext, ToolInvocation, ToolOutput, ToolRegistry};
pub use transcript::{Message, Transcript, TurnOutput};
pub use types::{ParticipantId, RunId, TokenUsage};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::desk::{Credentials, Desk};
    pub use crate::error::{Error, Result};
    pub use crate::llm_client::LlmClient;
    pub use crate::openrouter::OpenRouterClient;
    pub use crate::orchestrator::{ConversationRunner, RunHooks, TeamConfig, TerminationReason};
    pub use crate::participant::{Participant, TurnTaker};
    pub use crate::search::{CountrySearchTool, SearchClient};
    pub use crate::tools::{Tool, ToolOutput};
}
