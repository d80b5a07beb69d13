use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::patient::ContactChannel;

/// Which audience a notification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Patient,
    Caregiver,
}

impl RecipientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Caregiver => "caregiver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Self::Patient),
            "caregiver" => Some(Self::Caregiver),
            _ => None,
        }
    }
}

/// Delivery outcome of one attempt. Terminal outcomes are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Pending,
    Sent,
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One try to deliver one message for one alert to one recipient class.
/// Append-only; attempts within the dispatcher's idempotency scope
/// (per alert + recipient, not time-bounded) are deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub id: String,
    pub alert_id: String,
    pub recipient: RecipientKind,
    /// 1-based attempt counter per (alert, recipient).
    pub attempt_number: u32,
    pub attempted_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub channel: ContactChannel,
    pub provider_message_id: Option<String>,
}

impl NotificationAttempt {
    pub fn pending(
        alert_id: impl Into<String>,
        recipient: RecipientKind,
        attempt_number: u32,
        channel: ContactChannel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_id: alert_id.into(),
            recipient,
            attempt_number,
            attempted_at: now,
            outcome: AttemptOutcome::Pending,
            channel,
            provider_message_id: None,
        }
    }
}
