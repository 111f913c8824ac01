//! Team configuration parsing from YAML templates
//!
//! A team template names the participants in speaking order, their
//! instructions and tools, the termination sentinel, the turn budget and a
//! task template with a `{subject}` placeholder.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::orchestrator::round_robin::ConversationRunner;
use crate::participant::{Participant, TurnTaker};
use crate::termination::{TerminationDetector, DEFAULT_SENTINEL};
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_TEAM: &str = include_str!("../../templates/sovereign_risk.yaml");

/// Placeholder replaced by the run's subject
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Top-level team configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Team name, used in logs
    pub name: String,
    /// Messages allowed before the run is cut off
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Text that ends the conversation when a message contains it
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Opening task with a `{subject}` placeholder
    pub task: String,
    /// Participants in speaking order
    pub participants: Vec<ParticipantConfig>,
}

/// Participant instantiation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Participant name
    pub name: String,
    /// Role description
    #[serde(default)]
    pub description: String,
    /// System prompt for the participant
    pub system_prompt: String,
    /// LLM model identifier; the settings default when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Temperature override
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Names of registered tools this participant may call
    #[serde(default)]
    pub tools: Vec<String>,
}

impl ParticipantConfig {
    /// Build a participant from this configuration
    pub fn build(
        &self,
        client: Arc<dyn LlmClient>,
        registry: &ToolRegistry,
        settings: &Settings,
    ) -> Result<Participant> {
        let mut model = settings.model_config(self.model.as_deref());
        if let Some(temperature) = self.temperature {
            model = model.with_temperature(temperature);
        }
        let tools = self
            .tools
            .iter()
            .map(|name| registry.resolve(name))
            .collect::<Result<Vec<_>>>()?;

        Participant::builder()
            .name(&self.name)
            .description(&self.description)
            .system_prompt(&self.system_prompt)
            .model(model)
            .tools(tools)
            .max_tool_rounds(settings.llm.max_tool_rounds)
            .client(client)
            .build()
    }
}

fn default_max_turns() -> u32 {
    16
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

impl TeamConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse team YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read team file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// The sovereign-risk desk shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_TEAM)
    }

    /// Replace the turn budget
    pub fn with_max_turns(mut self, max_turns: u32) -> Result<Self> {
        self.max_turns = max_turns;
        self.validate()?;
        Ok(self)
    }

    /// Reject templates that could never run
    pub fn validate(&self) -> Result<()> {
        if self.participants.is_empty() {
            return Err(Error::config(format!(
                "Team '{}' has no participants",
                self.name
            )));
        }
        if self.max_turns == 0 {
            return Err(Error::config("max_turns must be at least 1"));
        }
        if self.sentinel.is_empty() {
            return Err(Error::config("sentinel must not be empty"));
        }
        if self.task.trim().is_empty() {
            return Err(Error::config("task must not be empty"));
        }
        let mut names = HashSet::new();
        for participant in &self.participants {
            if !names.insert(participant.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate participant name: {}",
                    participant.name
                )));
            }
            if let Some(temperature) = participant.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(Error::config(format!(
                        "temperature for {} must be within 0.0..=2.0, got {}",
                        participant.name, temperature
                    )));
                }
            }
        }
        Ok(())
    }

    /// Opening task for `subject`
    pub fn task_for(&self, subject: &str) -> String {
        self.task.replace(SUBJECT_PLACEHOLDER, subject)
    }

    /// Names of every tool the team refers to
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .participants
            .iter()
            .flat_map(|p| p.tools.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Instantiate participants in speaking order
    pub fn build_participants(
        &self,
        client: Arc<dyn LlmClient>,
        registry: &ToolRegistry,
        settings: &Settings,
    ) -> Result<Vec<Arc<dyn TurnTaker>>> {
        self.participants
            .iter()
            .map(|config| {
                config
                    .build(client.clone(), registry, settings)
                    .map(|p| Arc::new(p) as Arc<dyn TurnTaker>)
            })
            .collect()
    }

    /// Build a runner for this team
    pub fn runner(
        &self,
        client: Arc<dyn LlmClient>,
        registry: &ToolRegistry,
        settings: &Settings,
    ) -> Result<ConversationRunner> {
        let participants = self.build_participants(client, registry, settings)?;
        ConversationRunner::new(
            participants,
            TerminationDetector::new(self.sentinel.clone())?,
            self.max_turns,
        )
    }
}
