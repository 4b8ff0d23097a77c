use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_META_OBJECTS_PATH: &str = "meta-objects";
pub const DEFAULT_AGGREGATION_PATH: &str = "queries/aggregate";

/// Backend client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. The bearer
/// token is not part of this struct; it comes from the injected
/// [`CredentialsProvider`](crate::credentials::CredentialsProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub api_url: String,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Sent as `X-Tenant-Id` when set.
    pub tenant_id: Option<String>,
    /// Path of the meta-object list, relative to `api_url`.
    pub meta_objects_path: String,
    /// Path of the aggregation endpoint, relative to `api_url`.
    pub aggregation_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Configuration for `api_url` with every other field at its default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            tenant_id: None,
            meta_objects_path: DEFAULT_META_OBJECTS_PATH.to_string(),
            aggregation_path: DEFAULT_AGGREGATION_PATH.to_string(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                     |
    /// |-------------------------------|-----------------------------|
    /// | `PAINEL_API_URL`              | `http://localhost:8080/api` |
    /// | `PAINEL_REQUEST_TIMEOUT_SECS` | `30`                        |
    /// | `PAINEL_TENANT_ID`            | unset                       |
    /// | `PAINEL_META_OBJECTS_PATH`    | `meta-objects`              |
    /// | `PAINEL_AGGREGATION_PATH`     | `queries/aggregate`         |
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let request_timeout_secs = match var("PAINEL_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ClientError::Config(format!(
                    "PAINEL_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: var("PAINEL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            request_timeout_secs,
            tenant_id: var("PAINEL_TENANT_ID"),
            meta_objects_path: var("PAINEL_META_OBJECTS_PATH")
                .unwrap_or_else(|| DEFAULT_META_OBJECTS_PATH.into()),
            aggregation_path: var("PAINEL_AGGREGATION_PATH")
                .unwrap_or_else(|| DEFAULT_AGGREGATION_PATH.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PAINEL_API_URL", "https://crm.example.com/api"),
            ("PAINEL_REQUEST_TIMEOUT_SECS", "5"),
            ("PAINEL_TENANT_ID", " acme "),
            ("PAINEL_AGGREGATION_PATH", "  "),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://crm.example.com/api");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.tenant_id.as_deref(), Some("acme"));
        assert_eq!(config.aggregation_path, DEFAULT_AGGREGATION_PATH);
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let result =
            ClientConfig::from_lookup(lookup(&[("PAINEL_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_matches!(result, Err(ClientError::Config(_)));
    }
}
