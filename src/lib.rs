//! mortar-input - interactive input relay for the mortar build daemon.
//!
//! Mortar runs its actual build work inside a long-lived daemon process,
//! while the terminal's standard input belongs to the short-lived CLI
//! process the user invoked. Any build logic that wants to prompt the user
//! must therefore receive its input through an inter-process relay. This
//! crate provides both ends of that relay:
//!
//! - [`client`]: eagerly consumes the CLI's stdin, decodes it into lines,
//!   and re-emits each line as a typed [`protocol::InputMessage`] over the
//!   daemon connection.
//! - [`daemon`]: buffers arriving input messages and serves them, one at a
//!   time, to whichever build step is currently waiting on user input.
//!
//! The transport between the two ends is out of scope; anything that can
//! carry an [`protocol::InputMessage`] in order works (see
//! [`client::Dispatch`]).

pub mod client;
pub mod daemon;
pub mod error;
pub mod protocol;

pub use error::{InputRelayError, Result};
