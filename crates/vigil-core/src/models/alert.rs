use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What triggered the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Silence exceeded the configured soft threshold.
    ProlongedInactivity,
    /// An explicit fall/help signal.
    FallDetected,
    /// Operator-created or externally sourced.
    Other,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProlongedInactivity => "prolonged_inactivity",
            Self::FallDetected => "fall_detected",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prolonged_inactivity" => Some(Self::ProlongedInactivity),
            "fall_detected" => Some(Self::FallDetected),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity levels for alerts and their notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Stored state of an alert row. `NORMAL` has no row and therefore no
/// `AlertState`; see [`AlertPhase`] for the full phase set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// A soft check-in prompt was issued; waiting for activity.
    AwaitingCheckin,
    /// Caregiver escalation. Not self-healing from passive activity.
    Escalated,
    /// Terminal: closed by activity or explicit acknowledgment.
    Resolved,
    /// Terminal: manual operator override.
    FalseAlarm,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingCheckin => "awaiting_checkin",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
            Self::FalseAlarm => "false_alarm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "awaiting_checkin" => Some(Self::AwaitingCheckin),
            "escalated" => Some(Self::Escalated),
            "resolved" => Some(Self::Resolved),
            "false_alarm" => Some(Self::FalseAlarm),
            _ => None,
        }
    }

    /// Terminal states are immutable once entered, except for append-only
    /// resolution notes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalseAlarm)
    }

    pub fn phase(&self) -> AlertPhase {
        match self {
            Self::AwaitingCheckin => AlertPhase::AwaitingCheckin,
            Self::Escalated => AlertPhase::Escalated,
            Self::Resolved => AlertPhase::Resolved,
            Self::FalseAlarm => AlertPhase::FalseAlarm,
        }
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full phase set of the alert lifecycle, with `Normal` modeled
/// explicitly even though it is represented as the absence of a
/// non-terminal row. Keeping it a named variant makes the
/// "no active alert" precondition a testable case in the transition
/// table rather than an implicit null-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPhase {
    Normal,
    AwaitingCheckin,
    Escalated,
    Resolved,
    FalseAlarm,
}

impl AlertPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalseAlarm)
    }

    /// The allowed-transition table.
    ///
    /// - Normal → AwaitingCheckin (soft threshold crossed)
    /// - Normal → Escalated (immediate-escalation signal)
    /// - AwaitingCheckin → Escalated | Resolved | FalseAlarm
    /// - Escalated → Resolved | FalseAlarm
    /// - terminal → (nothing)
    pub fn can_transition_to(&self, to: AlertPhase) -> bool {
        use AlertPhase::*;
        matches!(
            (self, to),
            (Normal, AwaitingCheckin)
                | (Normal, Escalated)
                | (AwaitingCheckin, Escalated)
                | (AwaitingCheckin, Resolved)
                | (AwaitingCheckin, FalseAlarm)
                | (Escalated, Resolved)
                | (Escalated, FalseAlarm)
        )
    }
}

/// Who closed an alert, when, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    pub reason: String,
}

/// The unit the state machine manages.
///
/// Invariant: at most one alert in a non-terminal state per
/// (patient, kind) at any time, enforced by the store's
/// create-if-none-active operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// UUID v4 identifier.
    pub id: String,
    pub patient_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub state: AlertState,
    pub created_at: DateTime<Utc>,
    /// Stamped fresh on every state entry.
    pub state_entered_at: DateTime<Utc>,
    /// Activity record that caused the current state, if any.
    /// None for immediate-escalation signals.
    pub cause_activity_id: Option<String>,
    pub resolution: Option<Resolution>,
}

impl Alert {
    /// Build a new alert entering the given (non-terminal) state at `now`.
    pub fn open(
        patient_id: impl Into<String>,
        kind: AlertKind,
        severity: Severity,
        state: AlertState,
        cause_activity_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            kind,
            severity,
            state,
            created_at: now,
            state_entered_at: now,
            cause_activity_id,
            resolution: None,
        }
    }
}

/// Identity equality: two alerts are equal if they have the same ID.
impl PartialEq for Alert {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
