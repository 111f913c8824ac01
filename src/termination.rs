//! Sentinel-based termination detection

use crate::error::{Error, Result};
use crate::transcript::Message;
use serde::{Deserialize, Serialize};

/// Sentinel the synthesizer is instructed to emit when the report is final
pub const DEFAULT_SENTINEL: &str = "TERMINATE";

/// Ends a conversation when a message mentions the sentinel
///
/// Matching is an exact, case-sensitive substring test and nothing else.
/// Serialized as the bare sentinel string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerminationDetector {
    sentinel: String,
}

impl TerminationDetector {
    /// Create a detector; an empty sentinel would match every message
    pub fn new(sentinel: impl Into<String>) -> Result<Self> {
        let sentinel = sentinel.into();
        if sentinel.is_empty() {
            return Err(Error::config("termination sentinel must not be empty"));
        }
        Ok(Self { sentinel })
    }

    /// The configured sentinel
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Whether `message` ends the conversation
    pub fn is_terminal(&self, message: &Message) -> bool {
        self.matches(&message.content)
    }

    /// Whether `text` contains the sentinel
    pub fn matches(&self, text: &str) -> bool {
        text.contains(&self.sentinel)
    }
}

impl TryFrom<String> for TerminationDetector {
    type Error = Error;

    fn try_from(sentinel: String) -> Result<Self> {
        Self::new(sentinel)
    }
}

impl From<TerminationDetector> for String {
    fn from(detector: TerminationDetector) -> Self {
        detector.sentinel
    }
}

impl Default for TerminationDetector {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}
