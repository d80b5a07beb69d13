use serde::{Deserialize, Serialize};

/// Delivery channel for a contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    Sms,
    Voice,
    Webhook,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Voice => "voice",
            Self::Webhook => "webhook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(Self::Sms),
            "voice" => Some(Self::Voice),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

/// One routable address on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub channel: ContactChannel,
    pub address: String,
}

/// Identity the engine monitors. Created and owned by the external
/// profile system; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub display_name: String,
    pub monitoring_enabled: bool,
    /// Contact routing for patient-facing notifications.
    pub contacts: Vec<ContactPoint>,
    /// Contact routing for caregiver-facing notifications.
    pub caregiver_contacts: Vec<ContactPoint>,
    /// Sensor device identifiers mapped to this patient.
    pub device_ids: Vec<String>,
}

impl Patient {
    /// First contact point for the given recipient side, if any.
    pub fn primary_contact(&self, caregiver: bool) -> Option<&ContactPoint> {
        if caregiver {
            self.caregiver_contacts.first()
        } else {
            self.contacts.first()
        }
    }
}
