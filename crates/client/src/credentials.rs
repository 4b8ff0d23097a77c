//! Credentials provider capability.
//!
//! Every outgoing request asks the injected provider for a bearer token at
//! send time, so token refreshes are picked up without rebuilding clients.

/// Supplies the bearer token attached to backend requests.
pub trait CredentialsProvider: Send + Sync {
    /// Current token, or `None` to send the request unauthenticated.
    fn bearer_token(&self) -> Option<String>;
}

/// Sends every request without credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct Anonymous;

impl CredentialsProvider for Anonymous {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialsProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

/// Default variable read by [`EnvToken::default`].
pub const DEFAULT_TOKEN_VAR: &str = "PAINEL_API_TOKEN";

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VAR)
    }
}

impl CredentialsProvider for EnvToken {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}
