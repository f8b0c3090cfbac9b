// crates/mash-harness-net/src/frame.rs
// ============================================================================
// Module: Length-Prefixed Framing
// Description: 4-byte big-endian length prefix codec over async byte streams.
// Purpose: Enforce the frame-size contract on both read and write paths.
// Dependencies: tokio, thiserror
// ============================================================================

//! ## Overview
//! Every wire message is one frame: a `u32` big-endian length followed by
//! that many payload bytes. Oversize frames fail locally on send and fail
//! the read on receive; the caller closes the connection in both cases.
//! Writes are atomic per frame: prefix and payload are assembled into one
//! buffer before any byte reaches the stream.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

// ============================================================================
// SECTION: Frame Errors
// ============================================================================

/// Errors raised by the framing layer.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame length exceeded the configured maximum.
    #[error("frame too large: {declared} > {max}")]
    Oversize {
        /// Declared payload length.
        declared: usize,
        /// Configured maximum payload length.
        max: usize,
    },
    /// Underlying stream error; partial writes surface here.
    #[error("frame io error: {0}")]
    Io(String),
    /// Stream closed before a full frame arrived.
    #[error("connection closed mid-frame")]
    Closed,
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Closed
        } else {
            Self::Io(err.to_string())
        }
    }
}

// ============================================================================
// SECTION: Frame Writer
// ============================================================================

/// Writes one frame, rejecting oversize payloads before any byte is sent.
///
/// # Errors
///
/// Returns [`FrameError::Oversize`] for payloads above `max`, or
/// [`FrameError::Io`] when the stream fails; an I/O failure may leave a
/// partial frame on the wire and the caller must close the connection.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max: usize) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max {
        return Err(FrameError::Oversize {
            declared: payload.len(),
            max,
        });
    }
    let declared = u32::try_from(payload.len()).map_err(|_| FrameError::Oversize {
        declared: payload.len(),
        max,
    })?;
    let mut buffer = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buffer.extend_from_slice(&declared.to_be_bytes());
    buffer.extend_from_slice(payload);
    writer.write_all(&buffer).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes only a length prefix, with no payload bytes following it.
///
/// Used by malformed-frame test actions that must place an oversize or
/// short-read declaration on the wire.
///
/// # Errors
///
/// Returns [`FrameError::Io`] when the stream fails.
pub async fn write_length_only<W>(writer: &mut W, declared: u32) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&declared.to_be_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

// ============================================================================
// SECTION: Frame Reader
// ============================================================================

/// Reads one frame, failing on oversize declarations.
///
/// # Errors
///
/// Returns [`FrameError::Oversize`] when the declared length exceeds `max`,
/// [`FrameError::Closed`] on end of stream, or [`FrameError::Io`] on stream
/// failure. Partial reads discard buffered bytes.
pub async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    reader.read_exact(&mut prefix).await?;
    let declared = usize::try_from(u32::from_be_bytes(prefix)).unwrap_or(usize::MAX);
    if declared > max {
        return Err(FrameError::Oversize {
            declared,
            max,
        });
    }
    let mut payload = vec![0u8; declared];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
