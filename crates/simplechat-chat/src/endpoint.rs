//! Remote chat endpoint

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use url::Url;

use simplechat_identity::TokenHandle;
use simplechat_telemetry::{Telemetry, TRACEPARENT_HEADER};

use crate::error::ChatError;
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Send one prompt. The bearer token is attached only when present.
    async fn send(&self, prompt: &str, token: Option<&TokenHandle>) -> Result<ChatReply>;
}

/// JSON over HTTP POST. No request timeout is applied.
pub struct HttpChatEndpoint {
    client: reqwest::Client,
    url: Url,
    telemetry: Telemetry,
}

impl HttpChatEndpoint {
    pub fn new(url: &str, telemetry: Telemetry) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: Url::parse(url)?,
            telemetry,
        })
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    async fn send(&self, prompt: &str, token: Option<&TokenHandle>) -> Result<ChatReply> {
        let mut request = self
            .client
            .post(self.url.clone())
            .json(&ChatRequest { prompt });

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token.authorization_header());
        }
        if let Some(traceparent) = self.telemetry.traceparent_for(&self.url) {
            request = request.header(TRACEPARENT_HEADER, traceparent);
        }

        tracing::debug!(url = %self.url, authorized = token.is_some(), "Sending prompt");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ChatError::MalformedBody(e.to_string()))
    }
}

/// Stands in when no endpoint URL is configured; every send fails
pub struct UnconfiguredEndpoint;

#[async_trait]
impl ChatEndpoint for UnconfiguredEndpoint {
    async fn send(&self, _prompt: &str, _token: Option<&TokenHandle>) -> Result<ChatReply> {
        Err(ChatError::NotConfigured)
    }
}
