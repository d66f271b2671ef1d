//! Buffering and hand-off of forwarded input inside the daemon.
//!
//! The daemon's connection handler pushes arriving input into an
//! [`InputMailbox`]; build logic that wants to read from the user pulls it
//! back out with [`read_input`](InputMailbox::read_input), one entry at a
//! time, waiting as long as necessary. Closure of the client's stdin is a
//! terminal state: once observed, every read reports [`UserInput::EndOfInput`]
//! immediately.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

/// One piece of interactive input served to build logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// A line of text the user entered.
    Response(String),
    /// No answer will ever come: the client's stdin closed, or the wait was
    /// interrupted.
    EndOfInput,
}

impl UserInput {
    /// Whether this is the end-of-input sentinel.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, UserInput::EndOfInput)
    }

    /// The response text.
    ///
    /// # Panics
    ///
    /// Panics on [`UserInput::EndOfInput`]. Build logic must check
    /// [`is_end_of_input`](Self::is_end_of_input) (or match) first;
    /// coercing "no answer" into an empty string would silently treat a
    /// closed session as a valid response.
    pub fn text(self) -> String {
        match self {
            UserInput::Response(text) => text,
            UserInput::EndOfInput => panic!("No response available."),
        }
    }
}

/// FIFO hand-off point between the connection handler and build logic.
///
/// One mailbox exists per build session that may need interactive input.
/// [`put_input`](Self::put_input) never blocks; [`read_input`](Self::read_input)
/// waits until an entry arrives, the mailbox closes, or the wait is
/// interrupted. The mailbox is unbounded: input arrives at typing speed, so
/// backpressure is not a concern.
///
/// Intended use is a single logical reader at a time. Concurrent readers
/// are safe (each entry is consumed exactly once) but the interleaving
/// between them is unspecified.
#[derive(Debug, Default)]
pub struct InputMailbox {
    state: Mutex<MailboxState>,
    /// Signalled when an entry is queued or the mailbox closes.
    available: Notify,
    /// Signalled to interrupt waiting readers.
    interrupted: Notify,
}

#[derive(Debug, Default)]
struct MailboxState {
    queue: VecDeque<String>,
    closed: bool,
}

impl InputMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one entry. Never blocks.
    ///
    /// A [`UserInput::Response`] is appended in arrival order;
    /// [`UserInput::EndOfInput`] closes the mailbox permanently. Input
    /// arriving after close is dropped, since no reader can ever be handed
    /// it without reordering against the close.
    pub fn put_input(&self, input: UserInput) {
        {
            let mut state = self.state.lock().expect("mailbox lock poisoned");
            match input {
                UserInput::Response(text) => {
                    if state.closed {
                        tracing::warn!("Discarding input received after close: '{}'", text);
                        return;
                    }
                    state.queue.push_back(text);
                }
                UserInput::EndOfInput => {
                    state.closed = true;
                }
            }
        }
        self.available.notify_one();
    }

    /// Take the next entry, waiting until one is available.
    ///
    /// Queued entries are served in arrival order, and are drained before
    /// the closed state is reported. Once the mailbox is closed and
    /// drained, every call returns [`UserInput::EndOfInput`] without
    /// waiting. An interrupt while waiting also yields
    /// [`UserInput::EndOfInput`]: to build logic, "the wait was cancelled"
    /// and "stdin closed" are the same condition, no answer is coming.
    pub async fn read_input(&self) -> UserInput {
        loop {
            // Register interest before inspecting state so a put_input
            // between the check and the wait is never missed.
            let available = self.available.notified();
            let interrupted = self.interrupted.notified();

            {
                let mut state = self.state.lock().expect("mailbox lock poisoned");
                if let Some(text) = state.queue.pop_front() {
                    return UserInput::Response(text);
                }
                if state.closed {
                    drop(state);
                    // Wake the next waiter so every reader observes the
                    // terminal state, not just the one notified by close.
                    self.available.notify_one();
                    return UserInput::EndOfInput;
                }
            }

            tokio::select! {
                _ = available => {}
                _ = interrupted => return UserInput::EndOfInput,
            }
        }
    }

    /// Interrupt every reader currently blocked in
    /// [`read_input`](Self::read_input); each returns
    /// [`UserInput::EndOfInput`].
    ///
    /// Not a terminal state: input put afterwards is still served to later
    /// reads. This is how the daemon resolves pending prompts when a build
    /// is cancelled.
    pub fn interrupt_waiters(&self) {
        self.interrupted.notify_waiters();
    }

    /// Whether the end-of-input sentinel has been received.
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("mailbox lock poisoned").closed
    }
}
