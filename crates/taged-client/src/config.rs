//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration of the taged API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin of the taged server, e.g. `https://notes.example.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub auth: AuthEndpoints,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    /// Upper bound for a single dispatch, in seconds
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            http: HttpClientConfig::default(),
            auth: AuthEndpoints::default(),
            refresh_policy: RefreshPolicy::default(),
            request_deadline_secs: default_request_deadline_secs(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds, enforced by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            user_agent: default_user_agent(),
        }
    }
}

/// Server paths of the token endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
    /// Token issuance (login); a 401 here never triggers a refresh
    #[serde(default = "default_token_path")]
    pub token_path: String,

    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Profile of the signed-in user
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            refresh_path: default_refresh_path(),
            profile_path: default_profile_path(),
        }
    }
}

impl AuthEndpoints {
    /// True when `path` names the token issuance endpoint, ignoring a trailing slash
    pub fn is_token_issuance(&self, path: &str) -> bool {
        normalize(path) == normalize(&self.token_path)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/')
}

/// How concurrent 401s share refresh calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Every failed request runs its own refresh call
    Independent,

    /// Refreshes are serialized; a request whose token was already replaced
    /// by another flow replays without refreshing again
    #[default]
    Coalesced,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_deadline_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_max_idle_per_host() -> usize {
    8
}

fn default_user_agent() -> String {
    format!("taged/{}", env!("CARGO_PKG_VERSION"))
}

fn default_token_path() -> String {
    "/api/auth/token/".to_string()
}

fn default_refresh_path() -> String {
    "/api/auth/token/refresh/".to_string()
}

fn default_profile_path() -> String {
    "/api/auth/myself/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_deadline_secs, 30);
        assert_eq!(config.refresh_policy, RefreshPolicy::Coalesced);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert!(config.http.user_agent.starts_with("taged/"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://notes.example.com", "refresh_policy": "independent"}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://notes.example.com");
        assert_eq!(config.refresh_policy, RefreshPolicy::Independent);
        assert_eq!(config.auth, AuthEndpoints::default());
        assert_eq!(config.http.timeout_secs, 60);
    }

    #[test]
    fn test_token_issuance_matching() {
        let endpoints = AuthEndpoints::default();
        assert!(endpoints.is_token_issuance("/api/auth/token/"));
        assert!(endpoints.is_token_issuance("/api/auth/token"));
        assert!(!endpoints.is_token_issuance("/api/auth/token/refresh/"));
        assert!(!endpoints.is_token_issuance("/api/notes/"));
    }
}
