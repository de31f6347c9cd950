//! Observation of tool calls and completed turns.
//!
//! The agent executes its tools itself and only reports them as
//! `tool: <name>(<input>)` lines. This module provides the [`TurnObserver`]
//! trait for watching those reports as they arrive, before the turn ends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use libagent::{AgentSession, ToolCall, TurnObserver};
//!
//! struct MyObserver;
//!
//! impl TurnObserver for MyObserver {
//!     fn on_tool_call(&self, call: &ToolCall) {
//!         println!("Tool called: {} with {:?}", call.name, call.input);
//!     }
//! }
//!
//! let session = AgentSession::builder()
//!     .bin_path("./agent")
//!     .api_key("sk-ant-...")
//!     .observer(Arc::new(MyObserver))
//!     .build()?;
//! ```

mod observer;

pub use observer::{LogLevel, LoggingObserver, TurnObserver};
