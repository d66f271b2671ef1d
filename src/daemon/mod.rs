//! Daemon-side half of the input relay.
//!
//! ## Components
//!
//! - [`mailbox`]: buffers forwarded input and serves it to build logic,
//!   one entry at a time, with blocking reads
//! - [`handler`]: translates inbound [`InputMessage`](crate::protocol::InputMessage)s
//!   into mailbox entries

pub mod handler;
pub mod mailbox;

pub use handler::apply_message;
pub use mailbox::{InputMailbox, UserInput};
