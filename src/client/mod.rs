//! Client-side half of the input relay.
//!
//! This runs inside the short-lived CLI process, which owns the terminal's
//! stdin on behalf of the daemon.
//!
//! ## Components
//!
//! - [`decoder`]: background task turning the raw byte stream into lines
//! - [`forwarder`]: translates lines into protocol messages and sends them
//!   through a [`Dispatch`] sink
//! - [`prompt`]: the handle the console subsystem uses to mark the next
//!   line as a prompt response

pub mod decoder;
pub mod forwarder;
pub mod prompt;

pub use decoder::{DEFAULT_READ_BUFFER_SIZE, LineDecoder, LineListener};
pub use forwarder::{Dispatch, InputRelay, RelayConfig};
pub use prompt::PromptSink;
