use crate::config::Config;
use crate::error::ApiError;
use crate::state::{Appointment, Health, Metadata};
use leptos::logging::log;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Assistant answer as the chat endpoint returns it on success.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub message: String,
    pub timestamp: Option<String>,
    pub metadata: Option<Metadata>,
}

#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply, ApiError>;
    async fn clear_conversation(&self, session_id: &str) -> Result<(), ApiError>;
}

#[allow(async_fn_in_trait)]
pub trait AppointmentBackend {
    async fn appointments(&self) -> Result<Vec<Appointment>, ApiError>;
    async fn appointments_by_phone(&self, phone: &str) -> Result<Vec<Appointment>, ApiError>;
    async fn delete_appointment(&self, id: &str) -> Result<(), ApiError>;
    async fn cleanup(&self) -> Result<(), ApiError>;
    async fn health(&self) -> Result<Health, ApiError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentsResponse {
    success: bool,
    #[serde(default)]
    appointments: Vec<Appointment>,
    #[serde(default)]
    message: Option<String>,
}

/// `{success, message}` answer of the mutating endpoints.
#[derive(Debug, Deserialize)]
struct Ack {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Error bodies come either flat or wrapped in FastAPI's `detail`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        if let Some(message) = self.message.or(self.error) {
            return Some(message);
        }
        match self.detail? {
            serde_json::Value::String(detail) => Some(detail),
            detail @ serde_json::Value::Object(_) => serde_json::from_value::<ErrorBody>(detail)
                .ok()
                .and_then(|body| body.message.or(body.error)),
            _ => None,
        }
    }
}

fn rejected(message: Option<String>, error: Option<String>) -> ApiError {
    ApiError::Rejected(
        message
            .or(error)
            .unwrap_or_else(|| "Unknown error".to_string()),
    )
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base: config.api_url.clone(),
        }
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        log!("GET {url}");
        read(self.client.get(url).send().await?).await
    }

    async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        log!("DELETE {url}");
        read(self.client.delete(url).send().await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        log!("POST {url}");
        let res = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;
        read(res).await
    }
}

async fn read<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    let status = res.status();
    let body = res.text().await?;
    decode(status, &body)
}

fn decode<T: DeserializeOwned>(status: reqwest::StatusCode, body: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message);
        return Err(ApiError::Status { status, message });
    }
    Ok(serde_json::from_str(body)?)
}

fn chat_reply(response: ChatResponse) -> Result<ChatReply, ApiError> {
    match response {
        ChatResponse {
            success: true,
            message: Some(message),
            timestamp,
            metadata,
            ..
        } => Ok(ChatReply {
            message,
            timestamp,
            metadata,
        }),
        ChatResponse {
            success: true,
            message: None,
            ..
        } => Err(ApiError::Rejected("Reply carried no message".to_string())),
        ChatResponse { error, message, .. } => Err(rejected(error, message)),
    }
}

fn appointment_list(response: AppointmentsResponse) -> Result<Vec<Appointment>, ApiError> {
    if response.success {
        Ok(response.appointments)
    } else {
        Err(rejected(response.message, None))
    }
}

fn acknowledged(ack: Ack) -> Result<(), ApiError> {
    if ack.success {
        Ok(())
    } else {
        Err(rejected(ack.message, ack.error))
    }
}

impl ChatBackend for HttpBackend {
    async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply, ApiError> {
        let request = ChatRequest {
            message,
            session_id,
        };
        let response: ChatResponse = self.post(&["api", "chat"], &request).await?;
        chat_reply(response)
    }

    async fn clear_conversation(&self, session_id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.delete(&["api", "conversation", session_id]).await?;
        Ok(())
    }
}

impl AppointmentBackend for HttpBackend {
    async fn appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        appointment_list(self.get(&["api", "appointments"]).await?)
    }

    async fn appointments_by_phone(&self, phone: &str) -> Result<Vec<Appointment>, ApiError> {
        appointment_list(self.get(&["api", "appointments", phone]).await?)
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), ApiError> {
        acknowledged(self.delete(&["api", "appointments", id]).await?)
    }

    async fn cleanup(&self) -> Result<(), ApiError> {
        acknowledged(
            self.post(&["api", "appointments", "cleanup"], &serde_json::json!({}))
                .await?,
        )
    }

    async fn health(&self) -> Result<Health, ApiError> {
        self.get(&["health"]).await
    }
}
