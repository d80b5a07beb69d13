use serde::{Deserialize, Serialize};

use crate::errors::VigilResult;
use crate::models::{ContactChannel, RecipientKind, Severity};

/// One outbound message, fully rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub alert_id: String,
    pub patient_id: String,
    pub recipient: RecipientKind,
    pub channel: ContactChannel,
    pub address: String,
    pub severity: Severity,
    pub subject: String,
    pub body: String,
}

/// Provider acknowledgment for a delivered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
}

/// External send capability: "send text to recipient, get success/failure".
/// Implementations own the bounded timeout; a timeout is a failure of the
/// call, never of the surrounding tick.
pub trait ISendCapability: Send + Sync {
    fn send(&self, request: &SendRequest) -> VigilResult<SendReceipt>;
}
