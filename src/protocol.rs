//! Wire vocabulary for forwarding interactive input to the daemon.
//!
//! The CLI process owns the terminal's stdin; the daemon owns the build
//! logic that may want to read from it. Everything the relay sends from the
//! client to the daemon is one of the [`InputMessage`] variants defined
//! here.
//!
//! ## Protocol Format
//!
//! Messages are framed using a simple length-delimited format:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON-encoded message
//!
//! The framing helpers are shared by both endpoints so they always agree on
//! the wire form; the connection itself (socket, pipe, in-process channel)
//! is supplied by the caller.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum message size (1 MB). Interactive input is line-sized; anything
/// larger indicates a corrupt frame.
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// A message carrying interactive input from the CLI to the daemon.
///
/// Ordering contract: messages arrive in the order the originating lines
/// were read from stdin, and `CloseInput` is always the last message a
/// given relay instance sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputMessage {
    /// An ordinary line of forwarded stdin, as raw bytes.
    ForwardInput { bytes: Vec<u8> },
    /// The line answering an interactive prompt the daemon asked for.
    UserResponse { text: String },
    /// No further input will ever arrive: stdin reached end-of-stream,
    /// failed, or the relay was stopped.
    CloseInput,
}

/// Write a length-delimited frame to an async writer.
///
/// # Errors
///
/// Returns an error if the data exceeds [`MAX_MESSAGE_SIZE`] or writing
/// fails.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "message too large: {} bytes (max {})",
                data.len(),
                MAX_MESSAGE_SIZE
            ),
        ));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-delimited frame from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - The connection is closed (EOF when reading the length)
/// - The message size exceeds [`MAX_MESSAGE_SIZE`]
/// - Reading fails
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {} bytes (max {})", len, MAX_MESSAGE_SIZE),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Serialize and write an input message to an async writer.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &InputMessage,
) -> io::Result<()> {
    let json =
        serde_json::to_vec(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_frame(writer, &json).await
}

/// Read and deserialize an input message from an async reader.
pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<InputMessage> {
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_input_serialization() {
        let msg = InputMessage::ForwardInput {
            bytes: b"hello".to_vec(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"ForwardInput""#));

        let deserialized: InputMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_user_response_serialization() {
        let msg = InputMessage::UserResponse {
            text: "yes".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"UserResponse""#));
        assert!(json.contains("yes"));

        let deserialized: InputMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_close_input_serialization() {
        // Unit variant carries no data payload
        let msg = InputMessage::CloseInput;
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"CloseInput""#));
        assert!(!json.contains(r#""data""#));

        let deserialized: InputMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, InputMessage::CloseInput);
    }

    #[tokio::test]
    async fn test_message_framing_roundtrip() {
        let messages = vec![
            InputMessage::ForwardInput {
                bytes: b"a line of input".to_vec(),
            },
            InputMessage::UserResponse {
                text: "42".to_string(),
            },
            InputMessage::CloseInput,
        ];

        let mut wire = Vec::new();
        for msg in &messages {
            write_message(&mut wire, msg).await.unwrap();
        }

        let mut reader = wire.as_slice();
        for expected in &messages {
            let msg = read_message(&mut reader).await.unwrap();
            assert_eq!(&msg, expected);
        }

        // Nothing left on the wire
        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_write_frame_rejects_oversized_message() {
        let data = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let mut wire = Vec::new();
        let err = write_frame(&mut wire, &data).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(MAX_MESSAGE_SIZE + 1).to_be_bytes());
        let err = read_frame(&mut wire.as_slice()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
