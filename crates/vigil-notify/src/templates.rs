//! Message templates, selected per (alert kind, alert state, recipient).

use vigil_core::models::{Alert, AlertKind, AlertState, Patient, RecipientKind};

/// A rendered message ready for the send capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Select and render the message for an alert/recipient pair.
pub fn render(alert: &Alert, patient: &Patient, recipient: RecipientKind) -> RenderedMessage {
    let name = patient.display_name.as_str();
    match (alert.state, recipient) {
        (AlertState::AwaitingCheckin, RecipientKind::Patient) => RenderedMessage {
            subject: "Just checking in".to_string(),
            body: format!(
                "Hi {name}, we haven't noticed any activity for a little while. \
                 Please reply or tap the check-in button to let us know you're okay."
            ),
        },
        (AlertState::Escalated, RecipientKind::Caregiver) => match alert.kind {
            AlertKind::FallDetected => RenderedMessage {
                subject: format!("Possible fall reported for {name}"),
                body: format!(
                    "A fall or help signal was reported for {name}. \
                     Please check on them right away."
                ),
            },
            AlertKind::ProlongedInactivity => RenderedMessage {
                subject: format!("Check-in needed for {name}"),
                body: format!(
                    "{name} has not responded to a check-in prompt and no activity \
                     has been detected. Please reach out to them."
                ),
            },
            AlertKind::Other => RenderedMessage {
                subject: format!("Alert escalated for {name}"),
                body: format!("An alert for {name} has been escalated. Please follow up."),
            },
        },
        // Remaining combinations (patient-facing escalations, close-outs)
        // share one neutral template.
        _ => RenderedMessage {
            subject: format!("Update on {name}"),
            body: format!(
                "There is an update on the wellness alert for {name} ({}).",
                alert.state.as_str()
            ),
        },
    }
}
