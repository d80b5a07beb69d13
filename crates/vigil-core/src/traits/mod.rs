//! Seams to the outside world: persistence, outbound send, and the
//! rate-limit counter backend.

mod counter;
mod sender;
mod store;

pub use counter::{IRateCounterStore, WindowState};
pub use sender::{ISendCapability, SendReceipt, SendRequest};
pub use store::{CreateOutcome, IEngineStore, TransitionOutcome};
