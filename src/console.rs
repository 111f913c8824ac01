//! Plain-text rendering of a run for the terminal

use crate::orchestrator::SubjectOutcome;
use crate::tools::{ToolInvocation, ToolOutput};
use crate::transcript::Message;

const RULE: &str = "----------";

/// Render one message with a sender header and its tool calls
pub fn render_message(subject: Option<&str>, message: &Message) -> String {
    let mut out = match subject {
        Some(subject) => format!("{} {} [{}] {}\n", RULE, message.sender, subject, RULE),
        None => format!("{} {} {}\n", RULE, message.sender, RULE),
    };
    for invocation in &message.tool_invocations {
        out.push_str(&render_invocation(invocation));
        out.push('\n');
    }
    out.push_str(&message.content);
    out.push('\n');
    out
}

fn render_invocation(invocation: &ToolInvocation) -> String {
    let status = match &invocation.outcome {
        ToolOutput::Success { .. } => "ok".to_string(),
        ToolOutput::Failure { reason } => format!("failed: {}", reason),
    };
    format!("[tool] {}({}) -> {}", invocation.tool, invocation.arguments, status)
}

/// One-line summary of a finished (or failed) run
pub fn render_status(outcome: &SubjectOutcome) -> String {
    match &outcome.result {
        Ok(run) => format!(
            "[{}] {} after {} messages, {} tokens, {:.1}s (run {})",
            outcome.subject,
            run.reason,
            run.transcript.len(),
            run.usage.total_tokens,
            run.elapsed.as_secs_f64(),
            run.run_id
        ),
        Err(e) => format!("[{}] failed: {}", outcome.subject, e),
    }
}
