//! Tool trait, tagged tool outcomes and invocation records

use crate::error::{Error, Result};
use crate::openrouter::ToolDefinition;
use crate::types::{ParticipantId, RunId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Participant whose turn requested the tool
    pub participant: ParticipantId,
    /// Run the turn belongs to
    pub run_id: RunId,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(participant: ParticipantId, run_id: RunId) -> Self {
        Self {
            participant,
            run_id,
        }
    }
}

/// Tagged outcome of a tool execution
///
/// A failure is an ordinary value handed back to the requesting participant,
/// never text disguised as a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    /// The tool produced a result
    Success {
        /// Text shown to the model
        content: String,
        /// Optional structured data
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// The tool failed; `reason` is shown to the model
    Failure {
        /// Why the tool failed
        reason: String,
    },
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(content: impl Into<String>) -> Self {
        Self::Success {
            content: content.into(),
            data: None,
        }
    }

    /// Create a successful tool output with data
    pub fn success_with_data(content: impl Into<String>, data: Value) -> Self {
        Self::Success {
            content: content.into(),
            data: Some(data),
        }
    }

    /// Create a failed tool output
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Whether the tool succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text fed back to the model as the tool message
    pub fn to_model_content(&self) -> String {
        match self {
            Self::Success { content, .. } => content.clone(),
            Self::Failure { reason } => format!("Error: {}", reason),
        }
    }
}

/// One tool call made during a participant's turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call identifier assigned by the model
    pub call_id: String,
    /// Tool name
    pub tool: String,
    /// Arguments as sent by the model
    pub arguments: Value,
    /// Result or error
    pub outcome: ToolOutput,
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Schema properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    /// Required properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Additional properties
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl JsonSchema {
    /// Create an empty object schema
    pub fn empty() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: None,
            required: None,
            additional: HashMap::new(),
        }
    }

    /// Derive the schema of an argument struct
    pub fn of<T: schemars::JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root)
            .and_then(serde_json::from_value::<JsonSchema>)
            .unwrap_or_else(|_| Self::empty());
        // Model APIs reject the meta keys schemars emits at the root, and the
        // struct's rustdoc is not meant for the model
        schema.additional.remove("$schema");
        schema.additional.remove("title");
        schema.additional.remove("description");
        schema
    }

    /// Check `params` against this schema
    pub fn validate(&self, params: &Value) -> Result<()> {
        let schema = serde_json::to_value(self)?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| Error::JsonSchema(e.to_string()))?;
        let errors: Vec<String> = match validator.validate(params) {
            Ok(()) => Vec::new(),
            Err(errs) => errs.map(|e| e.to_string()).collect(),
        };
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::JsonSchema(errors.join("; ")))
        }
    }
}

/// Tool trait defining the interface for participant capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier, used as the function name offered to the model
    fn id(&self) -> &str;

    /// Description for LLM function calling
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> JsonSchema;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Validate parameters before execution
    fn validate(&self, params: &Value) -> Result<()> {
        self.input_schema().validate(params)
    }

    /// Function definition offered to the model
    fn definition(&self) -> Result<ToolDefinition> {
        Ok(ToolDefinition::function(
            self.id(),
            self.description(),
            serde_json::to_value(self.input_schema())?,
        ))
    }
}

/// Named tools that team templates can refer to
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its id
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.id().to_string(), tool);
        self
    }

    /// Look up a tool, failing with a configuration error if unknown
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools.get(name).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = self.tools.keys().map(String::as_str).collect();
            known.sort_unstable();
            Error::config(format!(
                "Unknown tool '{}' (registered: {})",
                name,
                known.join(", ")
            ))
        })
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
