//! Configuration and credentials for an agent session.
//!
//! This module provides:
//!
//! - [`AgentConfig`] and [`AgentConfigBuilder`] for configuring a session
//! - [`AuthMethod`] for specifying where the API key comes from
//! - [`Credential`], the resolved secret injected into the agent's environment
//!
//! # Example
//!
//! ```ignore
//! use libagent::config::{AgentConfig, AuthMethod};
//!
//! let config = AgentConfig::builder()
//!     .bin_path("./bin/agent")
//!     .working_directory("/path/to/workspace")
//!     .api_key_from_env()
//!     .fallback(AuthMethod::ApiKey("sk-ant-...".into()))
//!     .build()?;
//! ```

pub mod auth;
pub mod builder;

pub use auth::{AuthMethod, Credential, ENV_API_KEY};
pub use builder::{AgentConfig, AgentConfigBuilder};
