//! Line decoding of the CLI's input stream.
//!
//! [`LineDecoder`] owns a byte stream and a background task that reads it,
//! assembles complete lines, and hands each line to a [`LineListener`]. The
//! listener is invoked directly on the background task, so delivery is
//! strictly in read order and never overlaps: the next read does not begin
//! until the listener has returned.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{InputRelayError, Result};

/// Default size of the read buffer used by [`LineDecoder`].
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// Receives decoded line events on the decoder's background task.
///
/// `on_line` is called once per complete line, in read order, with the line
/// terminator stripped. `on_end_of_stream` is called at most once per
/// decoder lifetime, after the last line, whether the stream ended
/// naturally, failed, or the decoder was stopped.
pub trait LineListener: Send {
    /// Handle one decoded line. Returning an error terminates the decoder
    /// task immediately; no further events are delivered.
    fn on_line(&mut self, line: String) -> Result<()>;

    /// Handle the end of the stream, with the read failure if there was
    /// one. An error becomes the decoder task's result, reported by
    /// [`LineDecoder::stop`].
    fn on_end_of_stream(&mut self, failure: Option<io::Error>) -> Result<()>;
}

/// Reads a byte stream on a background task and delivers it line by line.
///
/// The decoder is created idle; [`start`](Self::start) spawns the read task
/// and [`stop`](Self::stop) shuts it down cooperatively, unblocking a
/// pending read and waiting for the task to exit. Starting a decoder that
/// was already started is a no-op; starting after `stop()` is not
/// supported.
pub struct LineDecoder {
    pending: Option<PendingStart>,
    task: Option<JoinHandle<Result<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

struct PendingStart {
    stream: Box<dyn AsyncRead + Unpin + Send>,
    listener: Box<dyn LineListener>,
    buffer_size: usize,
}

impl LineDecoder {
    /// Create a decoder with the default read buffer size.
    pub fn new(
        stream: impl AsyncRead + Unpin + Send + 'static,
        listener: impl LineListener + 'static,
    ) -> Self {
        Self::with_buffer_size(stream, listener, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Create a decoder with an explicit read buffer size.
    pub fn with_buffer_size(
        stream: impl AsyncRead + Unpin + Send + 'static,
        listener: impl LineListener + 'static,
        buffer_size: usize,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            pending: Some(PendingStart {
                stream: Box::new(stream),
                listener: Box::new(listener),
                buffer_size,
            }),
            task: None,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Spawn the background read task. No-op if already started.
    pub fn start(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let shutdown_rx = self.shutdown_rx.clone();
        self.task = Some(tokio::spawn(read_loop(pending, shutdown_rx)));
    }

    /// Stop the background task and wait for it to exit.
    ///
    /// Unblocks a pending read; lines that were already fully read are
    /// delivered before the end-of-stream event, but an in-flight partial
    /// read may be abandoned. After `stop()` returns, no further listener
    /// callbacks fire. Safe to call if the stream already ended, and safe
    /// to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the task's failure if it terminated abnormally, most notably
    /// a dispatch failure from the listener.
    pub async fn stop(&mut self) -> Result<()> {
        // Never started: nothing to wait for.
        self.pending = None;

        let _ = self.shutdown_tx.send(true);

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| InputRelayError::Task(e.to_string()))?,
            None => Ok(()),
        }
    }
}

async fn read_loop(pending: PendingStart, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let PendingStart {
        mut stream,
        mut listener,
        buffer_size,
    } = pending;

    let mut buf = vec![0u8; buffer_size];
    let mut carry: Vec<u8> = Vec::new();

    loop {
        // Biased toward the read arm: data that is already available is
        // drained before a stop request is observed, so a fully-read line
        // is never dropped by a concurrent stop().
        tokio::select! {
            biased;
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    // A trailing line without a terminator still counts.
                    if !carry.is_empty() {
                        let len = carry.len();
                        let line = take_line(&mut carry, len);
                        deliver(&mut listener, line)?;
                    }
                    return listener.on_end_of_stream(None);
                }
                Ok(n) => {
                    carry.extend_from_slice(&buf[..n]);
                    while let Some(end) = carry.iter().position(|&b| b == b'\n') {
                        let mut line = take_line(&mut carry, end + 1);
                        line.pop(); // '\n'
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        deliver(&mut listener, line)?;
                    }
                }
                Err(e) => {
                    return listener.on_end_of_stream(Some(e));
                }
            },
            _ = shutdown_rx.changed() => {
                return listener.on_end_of_stream(None);
            }
        }
    }
}

fn take_line(carry: &mut Vec<u8>, len: usize) -> Vec<u8> {
    let rest = carry.split_off(len);
    std::mem::replace(carry, rest)
}

fn deliver(listener: &mut Box<dyn LineListener>, line: Vec<u8>) -> Result<()> {
    let text = String::from_utf8_lossy(&line).into_owned();
    if let Err(e) = listener.on_line(text) {
        tracing::error!("Input line could not be forwarded, stopping relay: {}", e);
        return Err(e);
    }
    Ok(())
}
