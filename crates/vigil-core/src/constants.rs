/// Vigil engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Actor name recorded on resolutions applied by the engine itself
/// (as opposed to a caregiver or operator).
pub const ENGINE_ACTOR: &str = "vigil-engine";

/// Maximum length of free-form activity detail retained on a record.
/// Longer payload fragments are truncated before the append.
pub const MAX_ACTIVITY_DETAIL_LEN: usize = 1024;

/// Maximum number of per-patient errors carried in one tick summary.
pub const MAX_TICK_ERRORS: usize = 100;
