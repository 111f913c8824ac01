//! Core type definitions for riskdesk

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name-based identifier of a conversation participant
///
/// Participant names double as the `name` field of chat messages, so they are
/// restricted to ASCII letters, digits, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a participant ID, rejecting names a model API would refuse
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(crate::Error::config(format!(
                "Invalid participant name {:?}: use ASCII letters, digits, '_' or '-'",
                name
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Unique identifier for one conversation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a new token usage record
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add another token usage to this one
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_accepts_api_safe_names() {
        let id = ParticipantId::new("report_generation-agent2").unwrap();
        assert_eq!(id.as_str(), "report_generation-agent2");
        assert_eq!(id.to_string(), "report_generation-agent2");
    }

    #[test]
    fn test_participant_id_rejects_spaces_and_empty() {
        assert!(ParticipantId::new("").unwrap_err().is_config());
        assert!(ParticipantId::new("Dr. Janet").unwrap_err().is_config());
        assert!(ParticipantId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage::new(100, 20));
        total.add(TokenUsage::new(5, 7));
        assert_eq!(total, TokenUsage::new(105, 27));
        assert_eq!(total.total_tokens, 132);
    }
}
