//! Country research search backed by an online chat-completions service
//!
//! [`SearchClient::search`] performs exactly one outbound request and returns
//! a tagged result. [`CountrySearchTool`] exposes it to participants; there a
//! failed search becomes a [`ToolOutput::Failure`] the model can react to.

use crate::config::{RecencyFilter, SearchConfig};
use crate::error::{Error, Result};
use crate::openrouter::{chat_completions_url, Choice, CompletionRequest, Message};
use crate::tools::{JsonSchema, Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use schemars::JsonSchema as DeriveJsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

const RESEARCH_INSTRUCTIONS: &str = "\
You are an expert economic and political research assistant specializing in detailed, \
up-to-date information about countries. Your answers are accurate, comprehensive and \
fact-based, and include relevant indicators, statistics and quantitative analysis.
Prefer verified, recent information from reputable sources such as:
- World Bank World Development Indicators (WDI)
- International Monetary Fund (IMF) World Economic Outlook (WEO)
- United Nations Statistics Division
- CIA World Factbook
- CEIC economic and financial data, particularly for emerging economies
Include the URLs of all citations, references and sources used.
If exact data is unavailable, say so and provide context or relevant approximations.";

/// Result of one search: the query asked, the retrieved text and its sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Query as asked (the generated default when none was given)
    pub query: String,
    /// Retrieved answer text
    pub results: String,
    /// Citation URLs reported by the service
    pub citations: Vec<String>,
}

/// Default research query for a subject
pub fn default_query(subject: &str) -> String {
    format!(
        "Provide a detailed and current analysis of {}'s economic and political landscape. \
         Include recent GDP, economic indicators, major industries, government structure, \
         political developments, and international relations.",
        subject
    )
}

/// Compose the request text sent to the search service
pub fn compose_query(subject: &str, query: Option<&str>) -> String {
    let query = match query {
        Some(query) => query.trim_end_matches('.').to_string(),
        None => default_query(subject).trim_end_matches('.').to_string(),
    };
    format!(
        "Regarding {}: {}. Ensure the information is current and sourced from credible international reports.",
        subject, query
    )
}

#[derive(Serialize)]
struct SearchRequest {
    #[serde(flatten)]
    completion: CompletionRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_recency_filter: Option<RecencyFilter>,
}

#[derive(Deserialize)]
struct SearchResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

/// Client for the search service
pub struct SearchClient {
    client: Client,
    config: SearchConfig,
    url: String,
    limiter: DefaultDirectRateLimiter,
}

impl SearchClient {
    /// Create a new search client
    pub fn new(config: SearchConfig) -> Result<Self> {
        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| Error::config("search requests_per_minute must be at least 1"))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let url = chat_completions_url(&config.base_url);

        Ok(Self {
            client,
            config,
            url,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    /// Search for information about `subject`, optionally narrowed by `query`
    pub async fn search(&self, subject: &str, query: Option<&str>) -> Result<SearchRecord> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(Error::invalid_input("search subject must not be empty"));
        }
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let full_query = compose_query(subject, query);

        tracing::info!(subject, query = ?query, "search request");
        tracing::debug!(%full_query, "composed search query");

        let completion = CompletionRequest::new(
            &self.config.model,
            vec![Message::system(RESEARCH_INSTRUCTIONS), Message::user(&full_query)],
        )
        .with_max_tokens(self.config.max_tokens);
        let body = SearchRequest {
            completion,
            search_recency_filter: self.config.recency,
        };

        self.limiter.until_ready().await;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.config.api_key())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::upstream(format!(
                "Search failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        let results = parsed
            .choices
            .first()
            .map(|choice| choice.message.text().trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::upstream("Search returned no content"))?;

        tracing::info!(subject, citations = parsed.citations.len(), "search complete");

        Ok(SearchRecord {
            query: query.map(str::to_string).unwrap_or_else(|| default_query(subject)),
            results,
            citations: parsed.citations,
        })
    }
}

/// Arguments accepted by [`CountrySearchTool`]
#[derive(Debug, Deserialize, DeriveJsonSchema)]
pub struct CountrySearchArgs {
    /// Name of the country to research
    pub country: String,
    /// Specific question about the country's economy or politics
    #[serde(default)]
    pub user_query: Option<String>,
}

/// Participant-facing wrapper around [`SearchClient`]
pub struct CountrySearchTool {
    client: Arc<SearchClient>,
}

impl CountrySearchTool {
    /// Tool id offered to the model
    pub const ID: &'static str = "country_search";

    /// Create a new search tool over a shared client
    pub fn new(client: Arc<SearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CountrySearchTool {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Search reputable sources for recent, up-to-date information about a country. \
         Returns the query asked, the search results and citation URLs."
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::of::<CountrySearchArgs>()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let args: CountrySearchArgs = match serde_json::from_value(params) {
            Ok(args) => args,
            Err(e) => return Ok(ToolOutput::failure(format!("Invalid arguments: {}", e))),
        };

        match self.client.search(&args.country, args.user_query.as_deref()).await {
            Ok(record) => {
                let content = serde_json::to_string_pretty(&record)?;
                Ok(ToolOutput::success_with_data(content, serde_json::to_value(&record)?))
            }
            Err(e) => {
                tracing::error!(
                    run_id = %ctx.run_id,
                    participant = %ctx.participant,
                    country = %args.country,
                    error = %e,
                    "search failed"
                );
                Ok(ToolOutput::failure(format!("could not retrieve information: {}", e)))
            }
        }
    }
}
