use crate::error::ConfigError;
use std::env;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_BRANCH: &str = "main";

/// Runtime configuration for the repository directory client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    /// `None` means requests may block indefinitely.
    pub timeout_secs: Option<u64>,
    pub default_owner: Option<String>,
    pub default_branch: String,
    pub change_code: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are reported by presence only.
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_owner", &self.default_owner)
            .field("default_branch", &self.default_branch)
            .field("change_code", &self.change_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Build a configuration in code, with every optional knob at its default.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, ConfigError> {
        let api_url = validate_api_url(api_url.into())?;
        Ok(Self {
            token,
            api_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            default_owner: None,
            default_branch: DEFAULT_BRANCH.to_string(),
            change_code: None,
        })
    }

    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional; unauthenticated requests when absent]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: no timeout)
    /// - GITHUB_USER_AGENT (default: repo-directory/<version>)
    /// - REPO_DIRECTORY_OWNER (default owner login for tools)
    /// - REPO_DIRECTORY_DEFAULT_BRANCH (default: main)
    /// - REPO_DIRECTORY_CHANGE_CODE (enables the rename tool when set)
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = non_empty_var("GITHUB_TOKEN").or_else(|| non_empty_var("GH_TOKEN"));
        let api_url = validate_api_url(
            env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        )?;
        let api_version =
            env::var("GITHUB_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let timeout_secs = parse_timeout(env::var("GITHUB_HTTP_TIMEOUT_SECS").ok().as_deref());
        let user_agent = env::var("GITHUB_USER_AGENT").unwrap_or_else(|_| default_user_agent());
        let default_branch = non_empty_var("REPO_DIRECTORY_DEFAULT_BRANCH")
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
            default_owner: non_empty_var("REPO_DIRECTORY_OWNER"),
            default_branch,
            change_code: non_empty_var("REPO_DIRECTORY_CHANGE_CODE"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn default_user_agent() -> String {
    format!("repo-directory/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_timeout(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
}

fn validate_api_url(raw: String) -> Result<String, ConfigError> {
    let parsed = Url::parse(&raw).map_err(|e| ConfigError::InvalidApiUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            url: raw,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
