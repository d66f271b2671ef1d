//! Forwarding decoded stdin lines to the daemon connection.
//!
//! [`InputRelay`] wires a [`LineDecoder`] to a [`Dispatch`] sink: every
//! decoded line becomes one [`InputMessage`], and the end of the stream
//! becomes exactly one [`InputMessage::CloseInput`]. A line is normally
//! sent as [`InputMessage::ForwardInput`]; when the prompt subsystem has
//! announced that it is waiting for an answer (via
//! [`PromptSink::expect_response`](crate::client::PromptSink::expect_response)),
//! the next line is sent as [`InputMessage::UserResponse`] instead.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::client::decoder::{DEFAULT_READ_BUFFER_SIZE, LineDecoder, LineListener};
use crate::client::prompt::PromptSink;
use crate::error::{InputRelayError, Result};
use crate::protocol::InputMessage;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Size of the stdin read buffer.
    pub read_buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// The transport boundary: accepts one message at a time, in submission
/// order, for delivery to the daemon.
///
/// The relay performs no batching or retry on top of it; a dispatch failure
/// is fatal for the relay instance.
pub trait Dispatch: Send {
    /// Hand one message to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`InputRelayError::Dispatch`] if the transport can no longer
    /// accept messages.
    fn dispatch(&mut self, message: InputMessage) -> Result<()>;
}

/// An in-process channel is a valid transport; useful for tests and for
/// daemons running embedded in the client process.
impl Dispatch for mpsc::UnboundedSender<InputMessage> {
    fn dispatch(&mut self, message: InputMessage) -> Result<()> {
        self.send(message)
            .map_err(|_| InputRelayError::Dispatch("input channel closed".to_string()))
    }
}

/// Eagerly consumes the client's stdin, sending line by line `ForwardInput`
/// messages over the connection and finishing with a `CloseInput` message.
///
/// # Example
///
/// ```ignore
/// use mortar_input::client::InputRelay;
///
/// let mut relay = InputRelay::new(tokio::io::stdin(), connection_sink);
/// let prompt_sink = relay.prompt_sink();
/// relay.start();
/// // ... run the build; the console subsystem calls
/// // prompt_sink.expect_response() before each interactive question ...
/// relay.stop().await?;
/// ```
pub struct InputRelay {
    decoder: LineDecoder,
    expect_response: Arc<AtomicBool>,
}

impl InputRelay {
    /// Create a relay with the default configuration.
    pub fn new(
        stream: impl AsyncRead + Unpin + Send + 'static,
        dispatch: impl Dispatch + 'static,
    ) -> Self {
        Self::with_config(stream, dispatch, RelayConfig::default())
    }

    /// Create a relay with an explicit configuration.
    pub fn with_config(
        stream: impl AsyncRead + Unpin + Send + 'static,
        dispatch: impl Dispatch + 'static,
        config: RelayConfig,
    ) -> Self {
        let expect_response = Arc::new(AtomicBool::new(false));
        let listener = ForwardingListener {
            dispatch,
            expect_response: Arc::clone(&expect_response),
        };
        let decoder = LineDecoder::with_buffer_size(stream, listener, config.read_buffer_size);
        Self {
            decoder,
            expect_response,
        }
    }

    /// A handle for the prompt/console subsystem to mark the next line of
    /// input as the answer to an interactive question. Cloneable and usable
    /// from any task.
    pub fn prompt_sink(&self) -> PromptSink {
        PromptSink::new(Arc::clone(&self.expect_response))
    }

    /// Start consuming the input stream.
    pub fn start(&mut self) {
        self.decoder.start();
    }

    /// Stop the relay and wait for its background task to exit.
    ///
    /// # Errors
    ///
    /// Returns a [`InputRelayError::Dispatch`] error if the transport
    /// rejected a message before or during shutdown, including the final
    /// close message.
    pub async fn stop(&mut self) -> Result<()> {
        self.decoder.stop().await
    }
}

/// Translates line events into protocol messages.
struct ForwardingListener<D: Dispatch> {
    dispatch: D,
    expect_response: Arc<AtomicBool>,
}

impl<D: Dispatch> LineListener for ForwardingListener<D> {
    fn on_line(&mut self, line: String) -> Result<()> {
        tracing::debug!(
            "Forwarding input to daemon: '{}'",
            line.replace('\n', "\\n")
        );
        // Check-and-clear must be a single atomic step: at most one line is
        // ever attributed as the response to a given prompt signal.
        if self
            .expect_response
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.dispatch.dispatch(InputMessage::UserResponse { text: line })
        } else {
            self.dispatch.dispatch(InputMessage::ForwardInput {
                bytes: line.into_bytes(),
            })
        }
    }

    fn on_end_of_stream(&mut self, failure: Option<io::Error>) -> Result<()> {
        if let Some(e) = failure {
            tracing::warn!("Input stream failed: {}", e);
        }
        tracing::debug!("Dispatching close input message");
        if let Err(e) = self.dispatch.dispatch(InputMessage::CloseInput) {
            tracing::warn!("Failed to dispatch close input message: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn sink() -> (
        mpsc::UnboundedSender<InputMessage>,
        mpsc::UnboundedReceiver<InputMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<InputMessage>) -> Vec<InputMessage> {
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_forwards_lines_then_close() {
        let (tx, rx) = sink();
        let mut relay = InputRelay::new(&b"hello\nworld\n"[..], tx);
        relay.start();
        relay.stop().await.unwrap();

        assert_eq!(
            drain(rx).await,
            vec![
                InputMessage::ForwardInput {
                    bytes: b"hello".to_vec()
                },
                InputMessage::ForwardInput {
                    bytes: b"world".to_vec()
                },
                InputMessage::CloseInput,
            ]
        );
    }

    #[tokio::test]
    async fn test_signalled_line_becomes_user_response() {
        let (tx, rx) = sink();
        let mut relay = InputRelay::new(&b"42\n"[..], tx);
        relay.prompt_sink().expect_response();
        relay.start();
        relay.stop().await.unwrap();

        assert_eq!(
            drain(rx).await,
            vec![
                InputMessage::UserResponse {
                    text: "42".to_string()
                },
                InputMessage::CloseInput,
            ]
        );
    }

    #[tokio::test]
    async fn test_only_the_next_line_is_captured() {
        let (tx, rx) = sink();
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut relay = InputRelay::new(reader, tx);
        let prompt = relay.prompt_sink();
        relay.start();

        writer.write_all(b"plain\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        prompt.expect_response();
        writer.write_all(b"answer\nplain again\n").await.unwrap();
        drop(writer);

        relay.stop().await.unwrap();
        assert_eq!(
            drain(rx).await,
            vec![
                InputMessage::ForwardInput {
                    bytes: b"plain".to_vec()
                },
                InputMessage::UserResponse {
                    text: "answer".to_string()
                },
                InputMessage::ForwardInput {
                    bytes: b"plain again".to_vec()
                },
                InputMessage::CloseInput,
            ]
        );
    }

    #[tokio::test]
    async fn test_double_signal_captures_a_single_line() {
        let (tx, rx) = sink();
        let mut relay = InputRelay::new(&b"first\nsecond\n"[..], tx);
        let prompt = relay.prompt_sink();
        prompt.expect_response();
        prompt.expect_response();
        relay.start();
        relay.stop().await.unwrap();

        assert_eq!(
            drain(rx).await,
            vec![
                InputMessage::UserResponse {
                    text: "first".to_string()
                },
                InputMessage::ForwardInput {
                    bytes: b"second".to_vec()
                },
                InputMessage::CloseInput,
            ]
        );
    }

    #[tokio::test]
    async fn test_signal_after_close_is_abandoned() {
        let (tx, rx) = sink();
        let mut relay = InputRelay::new(&b""[..], tx);
        let prompt = relay.prompt_sink();
        relay.start();
        relay.stop().await.unwrap();

        // The stream is gone; the flag has nothing left to capture.
        prompt.expect_response();
        assert_eq!(drain(rx).await, vec![InputMessage::CloseInput]);
    }

    #[tokio::test]
    async fn test_close_dispatch_failure_surfaces_from_stop() {
        let (tx, rx) = sink();
        drop(rx);
        // Empty stream: the only message the relay ever attempts is the
        // close message, and its failure must not be swallowed.
        let mut relay = InputRelay::new(&b""[..], tx);
        relay.start();

        let err = relay.stop().await.unwrap_err();
        assert!(matches!(err, InputRelayError::Dispatch(_)));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_fatal_for_the_relay() {
        let (tx, rx) = sink();
        drop(rx);
        let mut relay = InputRelay::new(&b"unsendable\n"[..], tx);
        relay.start();

        let err = relay.stop().await.unwrap_err();
        assert!(matches!(err, InputRelayError::Dispatch(_)));
    }
}
