//! # libagent
//!
//! Async Rust driver for a line-oriented agent REPL subprocess.
//!
//! The agent prints a `You: ` prompt, reads one request per line and answers
//! with `Agent: ` message lines and `tool: ` invocation lines. This library
//! keeps one agent process alive per session and turns each reply into a
//! typed [`TurnResult`]:
//! - Process lifecycle with explicit start and dispose
//! - One turn at a time, queued in arrival order
//! - ANSI-tolerant parsing of the agent's output
//! - Tool observation callbacks
//!
//! ## Quick Start
//!
//! ```ignore
//! use libagent::{AgentSession, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = AgentSession::new("./bin/agent", ".", "sk-ant-...")?;
//!     session.start();
//!     let turn = session.send_message("What is 2+2?").await?;
//!     println!("{}", turn.text());
//!     session.dispose();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use libagent::{AgentSession, LoggingObserver};
//!
//! let session = AgentSession::builder()
//!     .bin_path("./bin/agent")
//!     .working_directory("/path/to/workspace")
//!     .api_key_from_env()
//!     .timeout(Duration::from_secs(300))
//!     .observer(Arc::new(LoggingObserver::default()))
//!     .build()?;
//! ```
//!
//! ## Host payload
//!
//! ```ignore
//! let turn = session.send_message("Summarize the README").await?;
//! let payload = serde_json::to_string(&turn.to_wire())?;
//! // {"messages":[{"text":"..."}],"toolCalls":[{"name":"read_file","input":"README.md"}]}
//! ```

pub mod config;
mod error;
pub mod process;
pub mod protocol;
mod session;
pub mod tools;

pub use error::{Error, Result};

// Re-export the main session types at crate root
pub use session::{with_timeout, AgentSession, SessionBuilder};

// Re-export commonly used config types at crate root
pub use config::{AgentConfig, AgentConfigBuilder, AuthMethod};

// Re-export commonly used protocol types at crate root
pub use protocol::{Message, ToolCall, TurnEntry, TurnResult, WireTurn};

// Re-export observer types at crate root
pub use tools::{LogLevel, LoggingObserver, TurnObserver};
