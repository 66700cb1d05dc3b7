use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use leptos::logging::{log, warn};
use url::Url;

/// Where the backend listens when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// The backend rejects longer chat messages.
pub const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_api_url(DEFAULT_API_URL).expect("default url is valid")
    }
}

impl Config {
    pub fn with_api_url(raw: &str) -> Result<Self, ConfigError> {
        let api_url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_owned(),
            source,
        })?;
        match api_url.scheme() {
            "http" | "https" => Ok(Self { api_url }),
            scheme => Err(ConfigError::UnsupportedScheme(scheme.to_owned())),
        }
    }

    /// Build-time `MEDIBOOK_API_URL`, then the page's `?api=` parameter.
    pub fn load(search: &str) -> Self {
        let mut config = match option_env!("MEDIBOOK_API_URL") {
            Some(raw) => Self::with_api_url(raw).unwrap_or_else(|err| {
                warn!("Ignoring MEDIBOOK_API_URL: {err}");
                Self::default()
            }),
            None => Self::default(),
        };
        if let Err(err) = config.apply_query(search) {
            warn!("Ignoring api parameter: {err}");
        }
        log!("Backend at {}", config.api_url);
        config
    }

    fn apply_query(&mut self, search: &str) -> Result<(), ConfigError> {
        let url = Url::parse(&format!("http://someUrl.com{search}")).map_err(|source| {
            ConfigError::InvalidUrl {
                url: search.to_owned(),
                source,
            }
        })?;
        for (key, value) in url.query_pairs() {
            match &key[..] {
                "api" => *self = Self::with_api_url(&value)?,
                string => log!("Unexpected param {string}: {value}"),
            }
        }
        Ok(())
    }
}

/// Opaque key the backend uses to group chat turns.
pub fn new_session_id(now: DateTime<Utc>) -> String {
    format!("session_{}", now.timestamp_millis())
}
