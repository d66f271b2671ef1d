//! Translation of arriving protocol messages into mailbox entries.

use crate::daemon::mailbox::{InputMailbox, UserInput};
use crate::protocol::InputMessage;

/// Apply one inbound message to the session's mailbox.
///
/// The daemon's connection handler calls this for every [`InputMessage`] it
/// receives: forwarded bytes and captured responses both become
/// [`UserInput::Response`] entries, and `CloseInput` closes the mailbox.
/// Forwarded bytes are decoded as UTF-8, replacing invalid sequences, since
/// interactive input is text by the time it reaches build logic.
pub fn apply_message(mailbox: &InputMailbox, message: InputMessage) {
    match message {
        InputMessage::ForwardInput { bytes } => {
            mailbox.put_input(UserInput::Response(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        InputMessage::UserResponse { text } => {
            mailbox.put_input(UserInput::Response(text));
        }
        InputMessage::CloseInput => {
            tracing::debug!("Client input closed; closing input mailbox");
            mailbox.put_input(UserInput::EndOfInput);
        }
    }
}
