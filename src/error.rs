use thiserror::Error;

/// Failure of a single directory operation. Nothing is retried; every variant is the terminal
/// outcome of one attempt.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },
    #[error("{message}")]
    NotFound { status: Option<u16>, message: String },
    #[error("{message}")]
    Permission { status: Option<u16>, message: String },
    #[error("{message}")]
    Auth { status: Option<u16>, message: String },
    /// Rename target already exists under the same owner.
    #[error("{message}")]
    Conflict { status: Option<u16>, message: String },
    /// Host rejected the requested name.
    #[error("{message}")]
    InvalidName { status: Option<u16>, message: String },
    #[error("{message}")]
    NotAFile { status: Option<u16>, message: String },
}

impl DirectoryError {
    pub(crate) fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: format!("{}: {}", context, err),
            source: Some(err),
        }
    }

    /// Stable snake_case code used in tool output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_error",
            Self::NotFound { .. } => "not_found",
            Self::Permission { .. } => "forbidden",
            Self::Auth { .. } => "unauthorized",
            Self::Conflict { .. } => "conflict",
            Self::InvalidName { .. } => "invalid_name",
            Self::NotAFile { .. } => "not_a_file",
        }
    }

    /// HTTP status that produced this error, when one did.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. }
            | Self::NotFound { status, .. }
            | Self::Permission { status, .. }
            | Self::Auth { status, .. }
            | Self::Conflict { status, .. }
            | Self::InvalidName { status, .. }
            | Self::NotAFile { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message, .. }
            | Self::NotFound { message, .. }
            | Self::Permission { message, .. }
            | Self::Auth { message, .. }
            | Self::Conflict { message, .. }
            | Self::InvalidName { message, .. }
            | Self::NotAFile { message, .. } => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid GITHUB_API_URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}
