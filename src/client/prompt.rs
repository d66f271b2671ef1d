//! The capability surface the prompt/console subsystem uses to claim the
//! next line of input.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marks the next line of stdin as the answer to an interactive question.
///
/// The console subsystem calls [`expect_response`](Self::expect_response)
/// just before it expects the user's next line to answer a prompt it
/// rendered. The handle holds no state beyond the shared flag; it is cheap
/// to clone and safe to call from any thread or task, including while the
/// relay is consuming input.
#[derive(Clone)]
pub struct PromptSink {
    expect_response: Arc<AtomicBool>,
}

impl PromptSink {
    pub(crate) fn new(expect_response: Arc<AtomicBool>) -> Self {
        Self { expect_response }
    }

    /// Mark the next consumed line as a captured prompt response.
    ///
    /// Idempotent until a line consumes the mark. If the input stream has
    /// already closed, the mark is simply abandoned.
    pub fn expect_response(&self) {
        self.expect_response.store(true, Ordering::Release);
    }
}
