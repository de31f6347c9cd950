//! Line classification for agent output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::turn::ToolCall;

/// Printed by the agent when it is ready for the next input line.
pub const PROMPT_MARKER: &str = "You: ";
/// Label that opens a (possibly multi-line) agent message.
pub const MESSAGE_LABEL: &str = "Agent: ";
/// Label of a tool invocation line, `tool: <name>(<input>)`.
pub const TOOL_LABEL: &str = "tool: ";

/// SGR color sequences only; other escapes are left in place.
static SGR_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("SGR pattern is valid"));

/// Remove ANSI SGR escape sequences (`ESC [ <digits/semicolons> m`).
///
/// Borrows when the line carries no escapes, which is the common case for
/// continuation text.
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    if !line.contains('\x1b') {
        return Cow::Borrowed(line);
    }
    SGR_SEQUENCE.replace_all(line, "")
}

/// The kind of a single stripped output line.
///
/// Variants are listed in classification precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// The REPL prompt; a turn boundary.
    Prompt,
    /// A parsed `tool:` line.
    ToolCall(ToolCall),
    /// The text of an `Agent:` line with the label removed.
    Message(&'a str),
    /// Any other line.
    Continuation(&'a str),
}

/// Classify a line that has already been passed through [`strip_ansi`].
pub fn classify(line: &str) -> LineKind<'_> {
    if is_prompt(line) {
        LineKind::Prompt
    } else if let Some(rest) = line.strip_prefix(TOOL_LABEL) {
        LineKind::ToolCall(parse_tool_call(rest))
    } else if let Some(text) = line.strip_prefix(MESSAGE_LABEL) {
        LineKind::Message(text)
    } else {
        LineKind::Continuation(line)
    }
}

/// Whether a stripped line is the prompt marker, exactly or as a prefix.
pub fn is_prompt(line: &str) -> bool {
    line.starts_with(PROMPT_MARKER)
}

/// Parse the remainder of a tool line (after `tool: `).
///
/// The name runs up to the first `(`. Everything after it is the input, with
/// a single trailing `)` removed when present. Parentheses are not matched.
pub fn parse_tool_call(rest: &str) -> ToolCall {
    match rest.split_once('(') {
        None => ToolCall::new(rest.trim()),
        Some((name, input)) => {
            let input = input.strip_suffix(')').unwrap_or(input);
            ToolCall::with_input(name.trim(), input)
        }
    }
}
