//! Subscriber initialization. Filtering comes from `RUST_LOG` with an
//! `info` default; JSON output is for deployments that ship logs.

pub mod events;

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // Already-initialized is fine (tests init per-process).
    let _ = result;
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const TICK: &str = "vigil.tick";
    pub const INGEST: &str = "vigil.ingest";
    pub const DISPATCH: &str = "vigil.dispatch";
}

/// Create a tick span.
#[macro_export]
macro_rules! tick_span {
    ($patient_count:expr) => {
        tracing::info_span!("vigil.tick", patient_count = $patient_count)
    };
}

/// Create an ingest span.
#[macro_export]
macro_rules! ingest_span {
    ($sender:expr) => {
        tracing::info_span!("vigil.ingest", sender = %$sender)
    };
}

/// Create a dispatch span.
#[macro_export]
macro_rules! dispatch_span {
    ($alert_id:expr, $recipient:expr) => {
        tracing::info_span!("vigil.dispatch", alert_id = %$alert_id, recipient = ?$recipient)
    };
}
