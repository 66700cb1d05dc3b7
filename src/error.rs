use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend could not be reached at all.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Backend answered {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// Well-formed body carrying `success: false`.
    #[error("Backend refused the request: {0}")]
    Rejected(String),

    #[error("Malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Text for the blocking notification and the inline banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Cannot reach the backend. Make sure the server is running.".to_string()
            }
            ApiError::Rejected(message) => message.clone(),
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid backend url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported backend url scheme {0:?}")]
    UnsupportedScheme(String),
}
