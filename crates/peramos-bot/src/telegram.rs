//! Minimal Telegram Bot API client: getMe, getUpdates, sendMessage.

use std::sync::Arc;
use std::time::Duration;

use peramos_core::TransportError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Extra time on top of the long-poll timeout before the HTTP client gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Envelope wrapping every Bot API reply
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Arc<Client>,
    api_url: String,
    token: String,
}

impl TelegramClient {
    /// `poll_timeout` is the longest getUpdates call this client will make.
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(poll_timeout + POLL_GRACE)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    // Contains the token; never log it.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Check the token and fetch the bot's own account
    pub async fn get_me(&self) -> Result<User, TransportError> {
        let response = self.client.get(self.method_url("getMe")).send().await?;
        self.handle_response(response).await
    }

    /// Long-poll for new updates after `offset`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message"],
        };

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Send a plain-text message to a chat
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let request = SendMessageRequest { chat_id, text };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await?;

        let _sent: Message = self.handle_response(response).await?;
        Ok(())
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized);
        }

        let body = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            TransportError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), e))
        })?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code,
                description,
                ..
            } => Err(TransportError::Api {
                code: error_code.unwrap_or(status.as_u16()),
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}
