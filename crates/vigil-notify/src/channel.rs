//! Webhook send adapter: posts the rendered message to the messaging
//! gateway as JSON. Owns the bounded request timeout; a timeout is a
//! failure of this call only.

use std::time::Duration;

use serde::Deserialize;

use vigil_core::config::defaults::DEFAULT_SEND_TIMEOUT_SECS;
use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::traits::{ISendCapability, SendReceipt, SendRequest};

#[derive(Debug, Clone)]
pub struct WebhookSenderConfig {
    /// Gateway endpoint receiving the message payload.
    pub endpoint: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl WebhookSenderConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: None,
            timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
        }
    }
}

/// Acknowledgment body the gateway may return.
#[derive(Debug, Deserialize)]
struct GatewayAck {
    message_id: Option<String>,
}

/// [`ISendCapability`] over an HTTP webhook.
pub struct WebhookSender {
    client: reqwest::blocking::Client,
    config: WebhookSenderConfig,
}

impl WebhookSender {
    pub fn new(config: WebhookSenderConfig) -> VigilResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VigilError::upstream(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

impl ISendCapability for WebhookSender {
    fn send(&self, request: &SendRequest) -> VigilResult<SendReceipt> {
        let mut builder = self.client.post(&self.config.endpoint).json(request);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .map_err(|e| VigilError::upstream(format!("send failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::upstream(format!(
                "gateway returned {status} for alert {}",
                request.alert_id
            )));
        }

        // The ack body is optional; a bare 2xx is a successful send.
        let provider_message_id = response
            .json::<GatewayAck>()
            .ok()
            .and_then(|ack| ack.message_id);
        Ok(SendReceipt {
            provider_message_id,
        })
    }
}
