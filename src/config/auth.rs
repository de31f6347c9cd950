//! Credential resolution for the agent subprocess.
//!
//! The agent reads its API key from an environment variable. The key can be
//! given directly or taken from the parent environment:
//!
//! ```ignore
//! use libagent::config::AuthMethod;
//!
//! let explicit = AuthMethod::ApiKey("sk-ant-...".into());
//! let inherited = AuthMethod::ApiKeyFromEnv; // default
//! ```

use std::fmt;

use crate::{Error, Result};

/// Environment variable name for the API key.
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Where the credential handed to the agent comes from.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Use this API key. An empty key counts as not configured.
    ApiKey(String),
    /// Read the API key from `ANTHROPIC_API_KEY` in the parent environment.
    #[default]
    ApiKeyFromEnv,
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            AuthMethod::ApiKeyFromEnv => f.write_str("ApiKeyFromEnv"),
        }
    }
}

/// A resolved secret, ready to be injected into the agent's environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    var: String,
    secret: String,
}

impl Credential {
    pub(crate) fn new(var: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            secret: secret.into(),
        }
    }

    /// Name of the environment variable the agent reads.
    pub fn env_var_name(&self) -> &str {
        &self.var
    }

    /// Get the secret value.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("var", &self.var)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Resolve an AuthMethod, then its fallbacks in order, to a credential.
///
/// `var` is the environment variable the agent expects the secret in.
pub(crate) fn resolve_auth(
    method: &AuthMethod,
    fallbacks: &[AuthMethod],
    var: &str,
) -> Result<Credential> {
    std::iter::once(method)
        .chain(fallbacks)
        .find_map(try_resolve_single)
        .map(|secret| Credential::new(var, secret))
        .ok_or(Error::AuthNotConfigured)
}

/// Returns None if the method is unavailable (e.g. missing env var).
fn try_resolve_single(method: &AuthMethod) -> Option<String> {
    match method {
        AuthMethod::ApiKey(key) if !key.is_empty() => Some(key.clone()),
        AuthMethod::ApiKey(_) => None,
        AuthMethod::ApiKeyFromEnv => match std::env::var(ENV_API_KEY) {
            Ok(key) if !key.is_empty() => Some(key),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_method_default() {
        assert_eq!(AuthMethod::default(), AuthMethod::ApiKeyFromEnv);
    }

    #[test]
    fn resolve_api_key_direct() {
        let resolved = resolve_auth(&AuthMethod::ApiKey("test-key".into()), &[], ENV_API_KEY)
            .unwrap();
        assert_eq!(resolved.env_var_name(), ENV_API_KEY);
        assert_eq!(resolved.secret(), "test-key");
    }

    #[test]
    fn resolve_custom_variable() {
        let resolved =
            resolve_auth(&AuthMethod::ApiKey("k".into()), &[], "AGENT_TOKEN").unwrap();
        assert_eq!(resolved.env_var_name(), "AGENT_TOKEN");
    }

    #[test]
    fn empty_key_falls_back() {
        let resolved = resolve_auth(
            &AuthMethod::ApiKey(String::new()),
            &[AuthMethod::ApiKey("fallback-key".into())],
            ENV_API_KEY,
        )
        .unwrap();
        assert_eq!(resolved.secret(), "fallback-key");
    }

    #[test]
    fn nothing_resolvable() {
        let result = resolve_auth(&AuthMethod::ApiKey(String::new()), &[], ENV_API_KEY);
        assert!(matches!(result, Err(Error::AuthNotConfigured)));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let method = AuthMethod::ApiKey("sk-secret".into());
        assert!(!format!("{method:?}").contains("sk-secret"));

        let credential = Credential::new(ENV_API_KEY, "sk-secret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains(ENV_API_KEY));
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthMethod>();
        assert_send_sync::<Credential>();
    }
}
