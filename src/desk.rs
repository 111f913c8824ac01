//! Research desk wiring
//!
//! Turns credentials, settings and a team template into runnable
//! conversations. Every credential is checked here, before any request is
//! sent.

use crate::config::{OpenRouterConfig, SearchConfig, Settings};
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::OpenRouterClient;
use crate::orchestrator::{ConcurrentRuns, PlannedRun, RunHooks, TeamConfig};
use crate::search::{CountrySearchTool, SearchClient};
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// API credentials for the language model and the search service
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Language model credentials
    pub llm: OpenRouterConfig,
    /// Search service credentials
    pub search: SearchConfig,
}

impl Credentials {
    /// Read both keys from the process environment (and `.env`)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve both keys through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            llm: OpenRouterConfig::from_lookup(&lookup)?,
            search: SearchConfig::from_lookup(&lookup)?,
        })
    }
}

/// A team ready to research any number of subjects
pub struct Desk {
    team: TeamConfig,
    settings: Settings,
    client: Arc<dyn LlmClient>,
    registry: ToolRegistry,
}

impl Desk {
    /// Build clients and tools for `team`
    pub fn new(team: TeamConfig, settings: Settings, credentials: Credentials) -> Result<Self> {
        let llm = settings.openrouter_config(credentials.llm)?;
        let client: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::new(llm)?);
        let search = Arc::new(SearchClient::new(
            credentials.search.with_settings(&settings.search)?,
        )?);
        let registry = ToolRegistry::new().register(Arc::new(CountrySearchTool::new(search)));

        for name in team.tool_names() {
            registry.resolve(name)?;
        }

        tracing::debug!(team = %team.name, participants = team.participants.len(), "desk ready");
        Ok(Self {
            team,
            settings,
            client,
            registry,
        })
    }

    /// Replace the language-model client
    pub fn with_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = client;
        self
    }

    /// Team template in use
    pub fn team(&self) -> &TeamConfig {
        &self.team
    }

    /// Plan one run per subject; `hooks_for` supplies observers per subject
    pub fn plan(
        &self,
        subjects: &[String],
        hooks_for: impl Fn(&str) -> RunHooks,
    ) -> Result<ConcurrentRuns> {
        if subjects.is_empty() {
            return Err(Error::invalid_input("at least one subject is required"));
        }

        let mut batch = ConcurrentRuns::new();
        for subject in subjects {
            let subject = subject.trim();
            if subject.is_empty() {
                return Err(Error::invalid_input("subject must not be empty"));
            }
            let runner = self
                .team
                .runner(self.client.clone(), &self.registry, &self.settings)?
                .with_hooks(hooks_for(subject));
            batch = batch.with_run(PlannedRun {
                subject: subject.to_string(),
                task: self.team.task_for(subject),
                runner,
            });
        }
        Ok(batch)
    }
}

impl std::fmt::Debug for Desk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desk")
            .field("team", &self.team.name)
            .field("client", &self.client.endpoint())
            .field("registry", &self.registry)
            .finish()
    }
}
