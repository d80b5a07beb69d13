//! Shared test support for the Vigil workspace: entity builders, an
//! in-memory store implementing the persistence traits, and a scripted
//! send capability.

mod memory_store;
mod scripted_sender;

pub use memory_store::InMemoryStore;
pub use scripted_sender::ScriptedSender;

use chrono::{DateTime, Utc};
use vigil_core::models::{
    ActivityRecord, ActivitySource, ContactChannel, ContactPoint, Patient,
};

/// A monitored patient with one SMS contact on each side (valid E.164,
/// derived from the id) and one mapped sensor device (`dev-<id>`).
pub fn make_patient(id: &str) -> Patient {
    let digits: u32 = id.bytes().map(u32::from).sum::<u32>() % 1_000_000;
    Patient {
        id: id.to_string(),
        display_name: format!("Patient {id}"),
        monitoring_enabled: true,
        contacts: vec![ContactPoint {
            channel: ContactChannel::Sms,
            address: format!("+1555{digits:06}"),
        }],
        caregiver_contacts: vec![ContactPoint {
            channel: ContactChannel::Sms,
            address: format!("+1666{digits:06}"),
        }],
        device_ids: vec![format!("dev-{id}")],
    }
}

/// Same as [`make_patient`] but with monitoring switched off.
pub fn make_unmonitored_patient(id: &str) -> Patient {
    Patient {
        monitoring_enabled: false,
        ..make_patient(id)
    }
}

pub fn make_activity(
    patient_id: &str,
    source: ActivitySource,
    recorded_at: DateTime<Utc>,
) -> ActivityRecord {
    ActivityRecord::new(patient_id, source, recorded_at, None)
}

/// A fixed evaluation instant so threshold tests are deterministic.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}
