use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{AuthService, GenerationService};
use crate::error::{PortalError, messages};
use crate::models::{AuthReply, AuthRequest, GenerationRequest, WireFormat};

fn build_client(timeout: Duration) -> Result<Client, PortalError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("duwdu-portal/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(PortalError::from)
}

/// Pulls the backend's `error` message out of a body, if it has one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

/// HttpAuthClient
///
/// POSTs `AuthRequest` bodies to the auth endpoint.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: Client,
    url: String,
}

impl HttpAuthClient {
    /// new
    ///
    /// # Errors
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, PortalError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl AuthService for HttpAuthClient {
    /// call
    ///
    /// Non-2xx and `success: false` are both refusals. The body's `error`
    /// field is passed through verbatim when present.
    async fn call(&self, request: &AuthRequest) -> Result<AuthReply, PortalError> {
        let action = request.action();
        tracing::debug!(action, url = %self.url, "auth request");

        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<AuthReply>(&body) {
            Ok(reply) if status.is_success() && reply.success => Ok(reply),
            Ok(reply) => {
                tracing::warn!(action, %status, error = ?reply.error, "auth request refused");
                Err(PortalError::rejected(reply.error, messages::AUTH_FALLBACK))
            }
            Err(_) if !status.is_success() => {
                tracing::warn!(action, %status, "auth request refused with unreadable body");
                Err(PortalError::rejected(None, messages::AUTH_FALLBACK))
            }
            Err(e) => {
                tracing::error!(action, error = %e, "malformed auth response");
                Err(PortalError::transport(e))
            }
        }
    }
}

/// HttpGenerationClient
///
/// POSTs shaped generation requests in the configured wire dialect.
#[derive(Clone)]
pub struct HttpGenerationClient {
    client: Client,
    url: String,
    format: WireFormat,
}

impl HttpGenerationClient {
    /// new
    ///
    /// # Errors
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(url: &str, timeout: Duration, format: WireFormat) -> Result<Self, PortalError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
            format,
        })
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, PortalError> {
        let module = request.module.as_str();
        let response = self
            .client
            .post(&self.url)
            .json(&request.to_body(self.format))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(module, %status, "generation request refused");
            return Err(PortalError::rejected(
                error_message(&body),
                messages::GENERATION_FALLBACK,
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(module, error = %e, "malformed generation response");
            PortalError::transport(e)
        })
    }
}
