//! Append-only conversation transcript

use crate::tools::ToolInvocation;
use crate::types::{ParticipantId, RunId, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a participant produced during one turn, before it is sequenced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnOutput {
    /// Message text
    pub content: String,
    /// Tool calls made while producing the text
    pub tool_invocations: Vec<ToolInvocation>,
    /// Tokens spent on the turn
    pub usage: TokenUsage,
}

impl TurnOutput {
    /// A turn consisting of text only
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// One completed turn as recorded in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the transcript, starting at 1
    pub sequence: u64,
    /// Participant that produced the message
    pub sender: ParticipantId,
    /// Message text
    pub content: String,
    /// Tool calls made during the turn
    pub tool_invocations: Vec<ToolInvocation>,
    /// Tokens spent on the turn
    pub usage: TokenUsage,
    /// When the message was appended
    pub created_at: DateTime<Utc>,
}

/// Ordered record of one run's messages
///
/// Messages can only be appended; sequences are assigned here and are
/// strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    run_id: RunId,
    task: String,
    messages: Vec<Message>,
}

impl Transcript {
    /// Start an empty transcript for `task`
    pub fn new(run_id: RunId, task: impl Into<String>) -> Self {
        Self {
            run_id,
            task: task.into(),
            messages: Vec::new(),
        }
    }

    /// Run this transcript belongs to
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Opening instruction every participant sees
    pub fn task(&self) -> &str {
        &self.task
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message has been appended yet
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total tokens spent across all turns
    pub fn usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for message in &self.messages {
            total.add(message.usage);
        }
        total
    }

    /// Sequence and append a turn, returning the stored message
    pub fn append(&mut self, sender: ParticipantId, turn: TurnOutput) -> &Message {
        let sequence = self.messages.last().map_or(1, |m| m.sequence + 1);
        self.messages.push(Message {
            sequence,
            sender,
            content: turn.content,
            tool_invocations: turn.tool_invocations,
            usage: turn.usage,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ParticipantId {
        ParticipantId::new(name).unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_sequences() {
        let mut transcript = Transcript::new(RunId::new(), "Report on Argentina");
        assert!(transcript.is_empty());

        let first = transcript.append(id("a"), TurnOutput::text("one")).sequence;
        let second = transcript.append(id("b"), TurnOutput::text("two")).sequence;
        let third = transcript.append(id("a"), TurnOutput::text("three")).sequence;

        assert_eq!((first, second, third), (1, 2, 3));
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().unwrap().content, "three");
        assert_eq!(transcript.task(), "Report on Argentina");
    }

    #[test]
    fn test_usage_sums_turns() {
        let mut transcript = Transcript::new(RunId::new(), "task");
        transcript.append(
            id("a"),
            TurnOutput {
                content: "x".into(),
                usage: TokenUsage::new(10, 2),
                ..Default::default()
            },
        );
        transcript.append(
            id("b"),
            TurnOutput {
                content: "y".into(),
                usage: TokenUsage::new(4, 4),
                ..Default::default()
            },
        );
        assert_eq!(transcript.usage(), TokenUsage::new(14, 6));
    }
}
