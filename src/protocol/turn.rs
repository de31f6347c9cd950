//! Turn types and the per-request accumulator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::line::{classify, strip_ansi, LineKind};
use crate::tools::TurnObserver;
use crate::Error;

/// A reply message, possibly spanning several output lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A tool invocation reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Raw text between the parentheses, if the line had any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

impl ToolCall {
    /// A tool call with no input payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
        }
    }

    pub fn with_input(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: Some(input.into()),
        }
    }
}

/// One entry of a turn, in the order it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEntry {
    Message(Message),
    ToolCall(ToolCall),
}

impl TurnEntry {
    /// Get the message if this entry is one.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            TurnEntry::Message(m) => Some(m),
            TurnEntry::ToolCall(_) => None,
        }
    }

    /// Get the tool call if this entry is one.
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            TurnEntry::ToolCall(t) => Some(t),
            TurnEntry::Message(_) => None,
        }
    }
}

/// The structured reply to one request.
///
/// Entries keep their chronological order. [`messages`](Self::messages) and
/// [`tool_calls`](Self::tool_calls) give the two kinds separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    entries: Vec<TurnEntry>,
}

impl TurnResult {
    /// All entries in wire order.
    pub fn entries(&self) -> &[TurnEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TurnEntry> {
        self.entries
    }

    /// Messages in the order they were opened.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(TurnEntry::as_message)
    }

    /// Tool calls in the order they were reported.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.entries.iter().filter_map(TurnEntry::as_tool_call)
    }

    /// All message texts joined with blank lines.
    pub fn text(&self) -> String {
        self.messages()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, entry: TurnEntry) {
        self.entries.push(entry);
    }

    /// Split into the host-facing two-list shape.
    pub fn to_wire(&self) -> WireTurn {
        WireTurn {
            messages: self.messages().cloned().collect(),
            tool_calls: self.tool_calls().cloned().collect(),
        }
    }

    /// The `{"messages": [...], "toolCalls": [...]}` payload a UI host posts.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.to_wire())
    }
}

/// A turn as two parallel lists, without relative ordering between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTurn {
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCall>,
}

impl From<TurnResult> for WireTurn {
    fn from(turn: TurnResult) -> Self {
        turn.to_wire()
    }
}

/// Where the parser is within the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing accumulated yet; prompts are the initial reprint.
    AwaitingTurnStart,
    /// At least one message or tool call seen; the next prompt ends the turn.
    InTurn,
}

/// Outcome of feeding one line to a [`TurnParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep reading.
    Continue,
    /// The closing prompt arrived; the turn is finished.
    Complete(TurnResult),
}

/// Accumulates raw output lines into one [`TurnResult`].
///
/// After a `Complete` step the parser is reset and ready for the next turn.
#[derive(Default)]
pub struct TurnParser {
    turn: TurnResult,
    last_message: Option<usize>,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl TurnParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that reports tool calls and completed turns.
    pub fn with_observer(observer: Option<Arc<dyn TurnObserver>>) -> Self {
        Self {
            observer,
            ..Self::default()
        }
    }

    pub fn state(&self) -> TurnState {
        if self.turn.is_empty() {
            TurnState::AwaitingTurnStart
        } else {
            TurnState::InTurn
        }
    }

    /// What has been accumulated so far.
    pub fn partial(&self) -> &TurnResult {
        &self.turn
    }

    /// Feed one raw output line (ANSI colors allowed, no trailing newline).
    pub fn feed(&mut self, raw: &str) -> Step {
        let line = strip_ansi(raw);
        match classify(&line) {
            LineKind::Prompt => match self.state() {
                TurnState::AwaitingTurnStart => {
                    tracing::trace!("skipping initial prompt");
                    Step::Continue
                }
                TurnState::InTurn => {
                    self.last_message = None;
                    let turn = std::mem::take(&mut self.turn);
                    if let Some(ref obs) = self.observer {
                        obs.on_turn_complete(&turn);
                    }
                    Step::Complete(turn)
                }
            },
            LineKind::ToolCall(call) => {
                if let Some(ref obs) = self.observer {
                    obs.on_tool_call(&call);
                }
                self.turn.push(TurnEntry::ToolCall(call));
                Step::Continue
            }
            LineKind::Message(text) => {
                self.last_message = Some(self.turn.len());
                self.turn.push(TurnEntry::Message(Message::new(text)));
                Step::Continue
            }
            LineKind::Continuation(text) => {
                match self.last_message.and_then(|i| self.turn.entries.get_mut(i)) {
                    Some(TurnEntry::Message(message)) => {
                        message.text.push('\n');
                        message.text.push_str(text);
                    }
                    _ => tracing::trace!(line = %text, "dropping text outside of a message"),
                }
                Step::Continue
            }
        }
    }

    /// The error for an output stream that closed before the turn completed.
    pub fn into_closed_error(self) -> Error {
        if self.turn.is_empty() {
            Error::StreamEndedEmpty
        } else {
            Error::TurnInterrupted {
                partial: Box::new(self.turn),
            }
        }
    }
}

impl std::fmt::Debug for TurnParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnParser")
            .field("turn", &self.turn)
            .field("last_message", &self.last_message)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
