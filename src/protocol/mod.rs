//! Text protocol spoken by a REPL agent on its stdout.
//!
//! The agent prints a prompt, reads one line of input, prints its reply and
//! prints the prompt again. Each reply line is one of:
//!
//! - the prompt marker `You: ` (turn boundary)
//! - `Agent: <text>`, opening a message
//! - `tool: <name>(<input>)`, reporting a tool invocation
//! - anything else, continuing the most recent message
//!
//! Lines may be wrapped in ANSI color codes.
//!
//! # Example
//!
//! ```
//! use libagent::protocol::{Step, TurnParser};
//!
//! let mut parser = TurnParser::new();
//! let lines = ["You: ", "\x1b[93mAgent\x1b[0m: hello", "world", "You: "];
//! let mut turn = None;
//! for line in lines {
//!     if let Step::Complete(t) = parser.feed(line) {
//!         turn = Some(t);
//!     }
//! }
//! assert_eq!(turn.unwrap().text(), "hello\nworld");
//! ```

mod line;
mod turn;

pub use line::{
    classify, is_prompt, parse_tool_call, strip_ansi, LineKind, MESSAGE_LABEL, PROMPT_MARKER,
    TOOL_LABEL,
};
pub use turn::{Message, Step, ToolCall, TurnEntry, TurnParser, TurnResult, TurnState, WireTurn};
