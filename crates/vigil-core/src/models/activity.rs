use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_ACTIVITY_DETAIL_LEN;

/// Where a "not in distress" signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    /// Conversational check-in.
    Conversational,
    /// Motion/presence sensor.
    Sensor,
    /// Explicit acknowledgment by the patient or a caregiver.
    ExplicitAck,
}

impl ActivitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversational => "conversational",
            Self::Sensor => "sensor",
            Self::ExplicitAck => "explicit_ack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conversational" => Some(Self::Conversational),
            "sensor" => Some(Self::Sensor),
            "explicit_ack" => Some(Self::ExplicitAck),
            _ => None,
        }
    }
}

/// Last-known "not in distress" timestamp for a (patient, source) pair.
/// Append-only; the engine only ever needs the per-patient maximum
/// timestamp when evaluating silence. Older rows are audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub patient_id: String,
    pub source: ActivitySource,
    pub recorded_at: DateTime<Utc>,
    pub detail: Option<String>,
}

impl ActivityRecord {
    pub fn new(
        patient_id: impl Into<String>,
        source: ActivitySource,
        recorded_at: DateTime<Utc>,
        detail: Option<String>,
    ) -> Self {
        let detail = detail.map(|d| {
            if d.len() > MAX_ACTIVITY_DETAIL_LEN {
                d.chars().take(MAX_ACTIVITY_DETAIL_LEN).collect()
            } else {
                d
            }
        });
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            source,
            recorded_at,
            detail,
        }
    }
}
