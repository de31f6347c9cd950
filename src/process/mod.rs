//! Process management for the agent REPL.
//!
//! One long-lived agent process serves every turn of a session. Requests are
//! written to its stdin one line at a time; replies are read back from its
//! stdout until the next prompt appears.
//!
//! # Architecture
//!
//! ```text
//! libagent                           agent REPL
//! ┌──────────────┐                  ┌─────────────┐
//! │ ProcessWriter│───stdin (line)──▶│             │
//! │ ProcessReader│◀──stdout (text)──│             │
//! │ StderrReader │◀──stderr (logs)──│             │
//! └──────────────┘                  └─────────────┘
//!        ▲
//!        │ exit status
//! ┌──────────────┐
//! │ watcher task │ owns the Child
//! └──────────────┘
//! ```
//!
//! # Output Protocol
//!
//! The agent prints its prompt without a trailing newline and then blocks on
//! input, so [`LineDecoder`] releases a bare prompt fragment as a line of its
//! own. Everything else is newline-delimited.

mod io;
mod spawn;

pub use io::{LineDecoder, ProcessReader, ProcessWriter, StderrReader};
pub use spawn::{AgentProcess, ProcessIo};
