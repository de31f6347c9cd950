//! Agent configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use libagent::config::AgentConfig;
//!
//! let config = AgentConfig::builder()
//!     .bin_path("./bin/agent")
//!     .working_directory("/path/to/workspace")
//!     .api_key("sk-ant-...")
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::auth::{resolve_auth, AuthMethod, Credential, ENV_API_KEY};
use crate::tools::TurnObserver;
use crate::{Error, Result};

/// Configuration for one agent session.
///
/// Use [`AgentConfig::builder()`] to create a new configuration.
#[derive(Clone)]
pub struct AgentConfig {
    pub(crate) credential: Credential,
    pub(crate) bin_path: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) observer: Option<Arc<dyn TurnObserver>>,
}

impl AgentConfig {
    /// Create a new builder for AgentConfig.
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Path of the agent executable.
    pub fn bin_path(&self) -> &Path {
        &self.bin_path
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Get the timeout if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the turn observer if set.
    pub fn observer(&self) -> Option<&Arc<dyn TurnObserver>> {
        self.observer.as_ref()
    }

    /// Get the environment variables to set for the subprocess.
    ///
    /// The credential is inserted last so it cannot be overridden by `env`.
    pub(crate) fn build_env(&self) -> HashMap<String, String> {
        let mut env = self.env_vars.clone();
        env.insert(
            self.credential.env_var_name().to_string(),
            self.credential.secret().to_string(),
        );
        env
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("credential", &self.credential)
            .field("bin_path", &self.bin_path)
            .field("args", &self.args)
            .field("working_directory", &self.working_directory)
            .field("env_vars", &self.env_vars.keys().collect::<Vec<_>>())
            .field("inherit_env", &self.inherit_env)
            .field("timeout", &self.timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Builder for [`AgentConfig`].
///
/// This builder validates the configuration when [`build()`](AgentConfigBuilder::build)
/// is called: the credential must resolve, the binary path must be set and the
/// working directory must exist.
#[derive(Clone)]
pub struct AgentConfigBuilder {
    // Authentication
    auth_method: AuthMethod,
    fallbacks: Vec<AuthMethod>,
    credential_var: String,

    // Process options
    bin_path: Option<PathBuf>,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,

    // Turn options
    timeout: Option<Duration>,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self {
            auth_method: AuthMethod::default(),
            fallbacks: Vec::new(),
            credential_var: ENV_API_KEY.to_string(),
            bin_path: None,
            args: Vec::new(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true, // Default: inherit parent environment
            timeout: None,
            observer: None,
        }
    }
}

impl fmt::Debug for AgentConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfigBuilder")
            .field("auth_method", &self.auth_method)
            .field("fallbacks", &self.fallbacks)
            .field("credential_var", &self.credential_var)
            .field("bin_path", &self.bin_path)
            .field("args", &self.args)
            .field("working_directory", &self.working_directory)
            .field("inherit_env", &self.inherit_env)
            .field("timeout", &self.timeout)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl AgentConfigBuilder {
    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------

    /// Use API key directly (passed to the subprocess environment).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.auth_method = AuthMethod::ApiKey(key.into());
        self
    }

    /// Read API key from ANTHROPIC_API_KEY env var.
    pub fn api_key_from_env(mut self) -> Self {
        self.auth_method = AuthMethod::ApiKeyFromEnv;
        self
    }

    /// Add fallback auth method if primary is unavailable.
    ///
    /// Fallbacks are checked at build time, in the order they were added.
    pub fn fallback(mut self, auth: AuthMethod) -> Self {
        self.fallbacks.push(auth);
        self
    }

    /// Name of the variable the credential is injected as (default: `ANTHROPIC_API_KEY`).
    pub fn credential_var(mut self, name: impl Into<String>) -> Self {
        self.credential_var = name.into();
        self
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the agent executable (required).
    pub fn bin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bin_path = Some(path.into());
        self
    }

    /// Add a command-line argument for the agent.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several command-line arguments for the agent.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory for the agent process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Add/override environment variable for subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Don't inherit parent environment (default: inherit).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    // -------------------------------------------------------------------------
    // Turn options
    // -------------------------------------------------------------------------

    /// Deadline for each turn.
    ///
    /// A turn that times out leaves the session desynchronized; it has to be
    /// disposed and recreated.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Observe tool calls and completed turns.
    pub fn observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The credential can be resolved
    /// - A binary path is set
    /// - The working directory exists, if set
    /// - The timeout is non-zero, if set
    ///
    /// Note: the binary itself is only checked at spawn time.
    pub fn build(self) -> Result<AgentConfig> {
        if self.credential_var.is_empty() || self.credential_var.contains('=') {
            return Err(Error::InvalidConfig(format!(
                "invalid credential variable name: {:?}",
                self.credential_var
            )));
        }
        let credential = resolve_auth(&self.auth_method, &self.fallbacks, &self.credential_var)?;

        let bin_path = match self.bin_path {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err(Error::InvalidConfig("agent binary path is required".into())),
        };

        if let Some(ref dir) = self.working_directory {
            if !dir.is_dir() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }

        Ok(AgentConfig {
            credential,
            bin_path,
            args: self.args,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
            timeout: self.timeout,
            observer: self.observer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::LoggingObserver;

    fn base() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
            .bin_path("/usr/local/bin/agent")
            .api_key("test-key")
    }

    #[test]
    fn builder_with_api_key() {
        let config = base().build().unwrap();
        assert_eq!(config.credential.secret(), "test-key");
        assert_eq!(config.credential.env_var_name(), ENV_API_KEY);
        assert_eq!(config.bin_path(), Path::new("/usr/local/bin/agent"));
    }

    #[test]
    fn builder_requires_bin_path() {
        let result = AgentConfigBuilder::default().api_key("key").build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = AgentConfigBuilder::default()
            .api_key("key")
            .bin_path("")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn builder_requires_credential() {
        let result = AgentConfigBuilder::default()
            .bin_path("agent")
            .api_key("")
            .build();
        assert!(matches!(result, Err(Error::AuthNotConfigured)));
    }

    #[test]
    fn builder_invalid_working_directory() {
        let result = base()
            .working_directory("/nonexistent/path/that/does/not/exist")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn builder_valid_working_directory() {
        let dir = std::env::temp_dir();
        let config = base().working_directory(&dir).build().unwrap();
        assert_eq!(config.working_directory(), Some(dir.as_path()));
    }

    #[test]
    fn builder_invalid_credential_var() {
        let result = base().credential_var("").build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        let result = base().credential_var("A=B").build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn builder_zero_timeout() {
        let result = base().timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn build_env() {
        let config = base()
            .api_key("secret-key")
            .env("CUSTOM_VAR", "custom_value")
            .build()
            .unwrap();

        let env = config.build_env();
        assert_eq!(env.get("ANTHROPIC_API_KEY"), Some(&"secret-key".to_string()));
        assert_eq!(env.get("CUSTOM_VAR"), Some(&"custom_value".to_string()));
    }

    #[test]
    fn credential_wins_over_env() {
        let config = base()
            .env(ENV_API_KEY, "from-env-map")
            .build()
            .unwrap();
        assert_eq!(
            config.build_env().get(ENV_API_KEY),
            Some(&"test-key".to_string())
        );
    }

    #[test]
    fn custom_credential_var() {
        let config = base().credential_var("AGENT_KEY").build().unwrap();
        let env = config.build_env();
        assert_eq!(env.get("AGENT_KEY"), Some(&"test-key".to_string()));
        assert!(!env.contains_key(ENV_API_KEY));
    }

    #[test]
    fn args_accumulate() {
        let config = base().arg("--verbose").args(["-c", "x"]).build().unwrap();
        assert_eq!(config.args, vec!["--verbose", "-c", "x"]);
    }

    #[test]
    fn debug_redacts_secret() {
        let config = base()
            .api_key("sk-very-secret")
            .env("OTHER", "hidden-value")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("hidden-value"));
        assert!(debug.contains("OTHER"));
    }

    #[test]
    fn observer_is_kept() {
        let config = base()
            .observer(Arc::new(LoggingObserver::new()))
            .build()
            .unwrap();
        assert!(config.observer().is_some());
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AgentConfig>();
        assert_send_sync::<AgentConfigBuilder>();
    }

    #[test]
    fn inherit_env_defaults_to_true() {
        let config = base().build().unwrap();
        assert!(config.inherit_env);
    }

    #[test]
    fn inherit_env_can_be_disabled() {
        let config = base().inherit_env(false).build().unwrap();
        assert!(!config.inherit_env);
    }
}
