//! Scripted send capability: records every request, optionally fails the
//! first N sends or delays to widen concurrency races.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::traits::{ISendCapability, SendReceipt, SendRequest};

#[derive(Default)]
pub struct ScriptedSender {
    sent: Mutex<Vec<SendRequest>>,
    fail_remaining: AtomicU32,
    delay: Option<Duration>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` sends with an upstream error before succeeding.
    pub fn failing(n: u32) -> Self {
        Self {
            fail_remaining: AtomicU32::new(n),
            ..Self::default()
        }
    }

    /// Sleep this long inside every send, to hold races open.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ISendCapability for ScriptedSender {
    fn send(&self, request: &SendRequest) -> VigilResult<SendReceipt> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(VigilError::upstream("scripted send failure"));
        }
        self.sent.lock().unwrap().push(request.clone());
        Ok(SendReceipt {
            provider_message_id: Some(format!("msg-{}", uuid::Uuid::new_v4())),
        })
    }
}
