//! Conversation participants
//!
//! Researchers and the synthesizer are the same [`Participant`] type; they
//! differ only in instructions and in whether they carry tools.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{
    CompletionRequest, Message as ChatMessage, ToolCall, ToolChoice, ToolDefinition,
};
use crate::tools::{Tool, ToolContext, ToolInvocation, ToolOutput};
use crate::transcript::{Transcript, TurnOutput};
use crate::types::{ParticipantId, TokenUsage};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Anything that can take a turn in a conversation
#[async_trait]
pub trait TurnTaker: Send + Sync {
    /// Identity used as the message sender
    fn id(&self) -> &ParticipantId;

    /// Produce the next message given everything said so far
    async fn take_turn(&self, transcript: &Transcript) -> Result<TurnOutput>;
}

/// A model-backed participant with optional tools
pub struct Participant {
    /// Name, also used as the chat `name` field
    pub id: ParticipantId,
    /// Role description shown to humans and in logs
    pub description: String,
    /// Instructions given to the model
    pub system_prompt: String,
    /// LLM model configuration
    pub model: ModelConfig,
    /// Tools this participant may call
    pub tools: Vec<Arc<dyn Tool>>,
    /// Tool-call round trips allowed before a text answer is forced
    pub max_tool_rounds: u32,
    client: Arc<dyn LlmClient>,
}

impl Participant {
    /// Create a new participant builder
    pub fn builder() -> ParticipantBuilder {
        ParticipantBuilder::new()
    }

    /// The chat history this participant sees for its next turn
    fn prompt_messages(&self, transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.push(ChatMessage::user(transcript.task()).with_name("user"));

        for message in transcript.messages() {
            if message.sender == self.id {
                messages.push(ChatMessage::assistant(&message.content));
            } else {
                messages.push(
                    ChatMessage::user(&message.content).with_name(message.sender.as_str()),
                );
            }
        }

        messages
    }

    fn tool_definitions(&self) -> Result<Vec<ToolDefinition>> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Execute one requested call; every failure becomes a tool outcome
    async fn invoke(&self, call: &ToolCall, ctx: &ToolContext) -> ToolInvocation {
        let name = call.function.name.clone();
        let raw = &call.function.arguments;
        let parsed: std::result::Result<Value, _> = if raw.trim().is_empty() {
            Ok(Value::Object(Default::default()))
        } else {
            serde_json::from_str(raw)
        };

        let (arguments, outcome) = match parsed {
            Err(e) => (
                Value::String(raw.clone()),
                ToolOutput::failure(format!("Arguments are not valid JSON: {}", e)),
            ),
            Ok(arguments) => {
                let outcome = match self.tools.iter().find(|tool| tool.id() == name) {
                    None => ToolOutput::failure(format!("Unknown tool: {}", name)),
                    Some(tool) => match tool.validate(&arguments) {
                        Err(e) => ToolOutput::failure(e.to_string()),
                        Ok(()) => match tool.execute(arguments.clone(), ctx).await {
                            Ok(output) => output,
                            Err(e) => ToolOutput::failure(e.to_string()),
                        },
                    },
                };
                (arguments, outcome)
            }
        };

        if let ToolOutput::Failure { reason } = &outcome {
            tracing::warn!(run_id = %ctx.run_id, participant = %self.id, tool = %name, %reason, "tool call failed");
        } else {
            tracing::debug!(run_id = %ctx.run_id, participant = %self.id, tool = %name, arguments = %arguments, "tool call succeeded");
        }

        ToolInvocation {
            call_id: call.id.clone(),
            tool: name,
            arguments,
            outcome,
        }
    }

    async fn generate(&self, turn: &mut TurnState) -> Result<ChatMessage> {
        let mut request = CompletionRequest::new(&self.model.model, turn.messages.clone())
            .with_temperature(self.model.temperature);
        if let Some(max_tokens) = self.model.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if turn.offer_tools {
            request = request
                .with_tools(turn.definitions.clone())
                .with_tool_choice(ToolChoice::Auto);
        }

        let response = self.client.complete(request).await?;
        if let Some(usage) = response.usage {
            turn.usage.add(usage.into());
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| Error::upstream("completion returned no choices"))
    }

    async fn run_turn(&self, transcript: &Transcript) -> Result<TurnOutput> {
        let ctx = ToolContext::new(self.id.clone(), transcript.run_id());
        let mut turn = TurnState {
            messages: self.prompt_messages(transcript),
            definitions: self.tool_definitions()?,
            offer_tools: false,
            usage: TokenUsage::default(),
            invocations: Vec::new(),
        };

        tracing::debug!(
            run_id = %ctx.run_id,
            participant = %self.id,
            role = %self.description,
            tools = turn.definitions.len(),
            "taking turn"
        );

        // The last round offers no tools, so it always ends the turn
        let mut round = 0;
        loop {
            turn.offer_tools = !turn.definitions.is_empty() && round < self.max_tool_rounds;
            let reply = self.generate(&mut turn).await?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() || !turn.offer_tools {
                return Ok(TurnOutput {
                    content: reply.text().trim().to_string(),
                    tool_invocations: turn.invocations,
                    usage: turn.usage,
                });
            }

            turn.messages.push(reply);
            for call in &calls {
                let invocation = self.invoke(call, &ctx).await;
                turn.messages
                    .push(ChatMessage::tool(invocation.outcome.to_model_content(), &call.id));
                turn.invocations.push(invocation);
            }
            round += 1;
        }
    }
}

struct TurnState {
    messages: Vec<ChatMessage>,
    definitions: Vec<ToolDefinition>,
    offer_tools: bool,
    usage: TokenUsage,
    invocations: Vec<ToolInvocation>,
}

#[async_trait]
impl TurnTaker for Participant {
    fn id(&self) -> &ParticipantId {
        &self.id
    }

    async fn take_turn(&self, transcript: &Transcript) -> Result<TurnOutput> {
        self.run_turn(transcript)
            .await
            .map_err(|e| Error::generation(self.id.as_str(), e))
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("model", &self.model.model)
            .field("tools", &self.tools.iter().map(|t| t.id()).collect::<Vec<_>>())
            .field("client", &self.client.client_type())
            .finish()
    }
}

/// Participant builder
pub struct ParticipantBuilder {
    name: Option<String>,
    description: String,
    system_prompt: Option<String>,
    model: Option<ModelConfig>,
    tools: Vec<Arc<dyn Tool>>,
    max_tool_rounds: u32,
    client: Option<Arc<dyn LlmClient>>,
}

impl ParticipantBuilder {
    /// Create a new participant builder
    pub fn new() -> Self {
        Self {
            name: None,
            description: String::new(),
            system_prompt: None,
            model: None,
            tools: Vec::new(),
            max_tool_rounds: 4,
            client: None,
        }
    }

    /// Set the participant name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the model configuration
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add multiple tools
    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Set the tool round limit
    pub fn max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Set the LLM client
    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the participant
    pub fn build(self) -> Result<Participant> {
        let name = self.name.ok_or_else(|| Error::config("Participant name is required"))?;
        let id = ParticipantId::new(name)?;
        let system_prompt = self
            .system_prompt
            .filter(|prompt| !prompt.trim().is_empty())
            .ok_or_else(|| Error::config(format!("System prompt is required for {}", id)))?;
        let client = self
            .client
            .ok_or_else(|| Error::config(format!("LLM client not configured for {}", id)))?;

        Ok(Participant {
            id,
            description: self.description,
            system_prompt,
            model: self
                .model
                .unwrap_or_else(|| ModelConfig::new(crate::config::presets::GPT4O)),
            tools: self.tools,
            max_tool_rounds: self.max_tool_rounds,
            client,
        })
    }
}

impl Default for ParticipantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::openrouter::{Choice, CompletionResponse, FunctionCall, Role, Usage};
    use crate::tools::JsonSchema;
    use crate::types::RunId;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every request it receives
    pub(crate) struct ScriptedClient {
        replies: Mutex<VecDeque<Result<ChatMessage>>>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        pub(crate) fn new(replies: Vec<Result<ChatMessage>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatMessage::assistant("(script exhausted)")))?;
            Ok(CompletionResponse {
                id: "test".to_string(),
                model: "test".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: reply,
                    finish_reason: Some("stop".to_string()),
                }],
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }

        fn client_type(&self) -> &str {
            "scripted"
        }

        fn endpoint(&self) -> &str {
            "http://localhost"
        }
    }

    pub(crate) fn tool_call(id: &str, name: &str, arguments: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            name: None,
            tool_calls: Some(vec![ToolCall {
                id: id.to_string(),
                tool_type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            tool_call_id: None,
        }
    }

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct LookupArgs {
        country: String,
    }

    struct LookupTool {
        fail: bool,
    }

    #[async_trait]
    impl Tool for LookupTool {
        fn id(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Look up a country fact"
        }

        fn input_schema(&self) -> JsonSchema {
            JsonSchema::of::<LookupArgs>()
        }

        async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
            if self.fail {
                return Err(Error::upstream("connection reset"));
            }
            Ok(ToolOutput::success(format!(
                "{} inflation: 211%",
                params["country"].as_str().unwrap_or("?")
            )))
        }
    }

    fn researcher(client: Arc<ScriptedClient>, fail: bool) -> Participant {
        Participant::builder()
            .name("fiscal_analysis_agent")
            .system_prompt("Research fiscal policy.")
            .tool(Arc::new(LookupTool { fail }))
            .max_tool_rounds(2)
            .client(client)
            .build()
            .unwrap()
    }

    fn id(name: &str) -> ParticipantId {
        ParticipantId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_text_turn_without_tools() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(ChatMessage::assistant(
            "  Final report.\nTERMINATE ",
        ))]));
        let synthesizer = Participant::builder()
            .name("report_generation_agent")
            .system_prompt("Write the report.")
            .client(client.clone())
            .build()
            .unwrap();

        let transcript = Transcript::new(RunId::new(), "Report on Argentina");
        let turn = synthesizer.take_turn(&transcript).await.unwrap();

        assert_eq!(turn.content, "Final report.\nTERMINATE");
        assert!(turn.tool_invocations.is_empty());
        assert_eq!(turn.usage.total_tokens, 15);
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_transcript_view_roles() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(ChatMessage::assistant("ok"))]));
        let participant = Participant::builder()
            .name("b")
            .system_prompt("You are B.")
            .client(client.clone())
            .build()
            .unwrap();

        let mut transcript = Transcript::new(RunId::new(), "task text");
        transcript.append(id("a"), TurnOutput::text("from a"));
        transcript.append(id("b"), TurnOutput::text("from b"));
        participant.take_turn(&transcript).await.unwrap();

        let sent = &client.requests()[0].messages;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].text(), "task text");
        assert_eq!(sent[2].role, Role::User);
        assert_eq!(sent[2].name.as_deref(), Some("a"));
        assert_eq!(sent[3].role, Role::Assistant);
        assert_eq!(sent[3].text(), "from b");
    }

    #[tokio::test]
    async fn test_tool_round_trip_is_recorded() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(tool_call("call_1", "lookup", r#"{"country":"Argentina"}"#)),
            Ok(ChatMessage::assistant("Inflation is very high.")),
        ]));
        let participant = researcher(client.clone(), false);

        let transcript = Transcript::new(RunId::new(), "task");
        let turn = participant.take_turn(&transcript).await.unwrap();

        assert_eq!(turn.content, "Inflation is very high.");
        assert_eq!(turn.tool_invocations.len(), 1);
        assert_eq!(turn.tool_invocations[0].arguments, json!({"country": "Argentina"}));
        assert!(turn.tool_invocations[0].outcome.is_success());
        assert_eq!(turn.usage.total_tokens, 30);

        let requests = client.requests();
        assert!(requests[0].tools.is_some());
        assert!(matches!(requests[0].tool_choice, Some(ToolChoice::Auto)));
        let followup = &requests[1].messages;
        let tool_message = followup.last().unwrap();
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.text(), "Argentina inflation: 211%");
    }

    #[tokio::test]
    async fn test_tool_error_is_fed_back_not_fatal() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(tool_call("call_1", "lookup", r#"{"country":"Argentina"}"#)),
            Ok(ChatMessage::assistant("Search is unavailable; proceeding with known data.")),
        ]));
        let participant = researcher(client.clone(), true);

        let turn = participant
            .take_turn(&Transcript::new(RunId::new(), "task"))
            .await
            .unwrap();

        assert!(!turn.tool_invocations[0].outcome.is_success());
        let tool_message = client.requests()[1].messages.last().cloned().unwrap();
        assert!(tool_message.text().starts_with("Error: "));
        assert!(tool_message.text().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments_become_failures() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(tool_call("call_1", "stock_quote", "{}")),
            Ok(tool_call("call_2", "lookup", "{not json")),
            Ok(ChatMessage::assistant("done")),
        ]));
        let participant = researcher(client, false);

        let turn = participant
            .take_turn(&Transcript::new(RunId::new(), "task"))
            .await
            .unwrap();

        assert_eq!(turn.tool_invocations.len(), 2);
        assert_eq!(
            turn.tool_invocations[0].outcome,
            ToolOutput::failure("Unknown tool: stock_quote")
        );
        assert_eq!(turn.tool_invocations[1].arguments, json!("{not json"));
        assert!(!turn.tool_invocations[1].outcome.is_success());
    }

    #[tokio::test]
    async fn test_schema_violation_is_failure() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(tool_call("call_1", "lookup", r#"{"topic":"gdp"}"#)),
            Ok(ChatMessage::assistant("done")),
        ]));
        let participant = researcher(client, false);

        let turn = participant
            .take_turn(&Transcript::new(RunId::new(), "task"))
            .await
            .unwrap();

        match &turn.tool_invocations[0].outcome {
            ToolOutput::Failure { reason } => assert!(reason.contains("JSON Schema")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exhausted_tool_rounds_force_text_answer() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(tool_call("call_1", "lookup", r#"{"country":"Chile"}"#)),
            Ok(tool_call("call_2", "lookup", r#"{"country":"Peru"}"#)),
            Ok(ChatMessage::assistant("Summary of Chile and Peru.")),
        ]));
        let participant = researcher(client.clone(), false);

        let turn = participant
            .take_turn(&Transcript::new(RunId::new(), "task"))
            .await
            .unwrap();

        assert_eq!(turn.content, "Summary of Chile and Peru.");
        assert_eq!(turn.tool_invocations.len(), 2);
        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].tools.is_none());
    }

    #[tokio::test]
    async fn test_generation_failure_names_participant() {
        let client = Arc::new(ScriptedClient::new(vec![Err(Error::upstream(
            "Request failed with status 500",
        ))]));
        let participant = researcher(client, false);

        let err = participant
            .take_turn(&Transcript::new(RunId::new(), "task"))
            .await
            .unwrap_err();

        match err {
            Error::Generation { participant, .. } => assert_eq!(participant, "fiscal_analysis_agent"),
            other => panic!("expected generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_requires_prompt_and_client() {
        let client: Arc<dyn LlmClient> = Arc::new(ScriptedClient::new(vec![]));
        assert!(Participant::builder()
            .name("a")
            .client(client.clone())
            .build()
            .unwrap_err()
            .is_config());
        assert!(Participant::builder()
            .name("a")
            .system_prompt("x")
            .build()
            .unwrap_err()
            .is_config());
        assert!(Participant::builder()
            .name("senior analyst")
            .system_prompt("x")
            .client(client)
            .build()
            .unwrap_err()
            .is_config());
    }
}
