use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Usage figures the backend attaches to a successful reply. Display only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// ISO timestamp, kept as the server sent it for assistant replies.
    pub timestamp: String,
    pub metadata: Option<Metadata>,
    /// Set on failure messages synthesized locally. Never sent anywhere.
    pub is_error: bool,
}

impl Message {
    pub fn user(content: String, now: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content,
            timestamp: iso(now),
            metadata: None,
            is_error: false,
        }
    }

    pub fn assistant(content: String, timestamp: String, metadata: Option<Metadata>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            timestamp,
            metadata,
            is_error: false,
        }
    }

    pub fn failure(content: String, now: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            timestamp: iso(now),
            metadata: None,
            is_error: true,
        }
    }

    pub fn is_me(&self) -> bool {
        self.role == Role::User
    }
}

/// Appointment row as served by the admin endpoints.
///
/// Only `id` is guaranteed: the phone search endpoint returns a reduced
/// record (id, date, time, reason, status).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Appointment {
    pub id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Groq {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub configured: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub groq: Option<Groq>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub environment: Option<String>,
}

impl Health {
    pub fn summary(&self) -> String {
        let mut summary = format!("Backend status: {}", self.status);
        if let Some(groq) = &self.groq {
            if let Some(model) = &groq.model {
                summary.push_str(&format!("\nModel: {model}"));
            }
            if groq.configured == Some(false) {
                summary.push_str("\nWarning: LLM API key is not configured");
            }
        }
        if let Some(environment) = &self.environment {
            summary.push_str(&format!("\nEnvironment: {environment}"));
        }
        if let Some(uptime) = self.uptime {
            summary.push_str(&format!("\nUptime: {uptime:.0}s"));
        }
        summary
    }
}

pub fn iso(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a backend timestamp into local wall-clock time.
///
/// Zone-aware strings are converted to the local zone, zone-less ones are
/// taken as already local.
pub fn parse_local(timestamp: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// `HH:MM` for display, or the raw string when it cannot be parsed.
pub fn display_time(timestamp: &str) -> String {
    match parse_local(timestamp) {
        Some(time) => time.format("%H:%M").to_string(),
        None => timestamp.to_owned(),
    }
}
