//! Wire protocol between [`NetworkTransport`](super::NetworkTransport) and
//! [`RemoteEndpointServer`](super::RemoteEndpointServer).
//!
//! A connection starts with a single `Authorization: Basic <token>\n` line.
//! The server answers with one byte: [`AUTH_READY`] or an [`ErrorCode`].
//! After that both sides exchange frames: a little-endian `u32` payload
//! length followed by a bincode-encoded [`Request`] or [`Response`].
//!
//! Every request gets exactly one response, except `Subscribe`: once it is
//! acknowledged the connection carries only `Event` frames from the server.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, StoreError};
use crate::types::{ChangeEvent, Columns, WireRow};

pub const AUTH_READY: u8 = 0;
pub const MAX_AUTH_HEADER_LEN: usize = 512;
pub const FRAME_HEADER_LEN: usize = 4;
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Read { address: String, columns: Columns },
    Insert { address: String, row: WireRow },
    BulkWrite { address: String, rows: Vec<WireRow> },
    Delete { address: String },
    Subscribe { namespace: String },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Read { .. } => "read",
            Request::Insert { .. } => "insert",
            Request::BulkWrite { .. } => "bulk_write",
            Request::Delete { .. } => "delete",
            Request::Subscribe { .. } => "subscribe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Rows(Vec<WireRow>),
    Inserted { address: String },
    Written { count: u64 },
    Deleted,
    Subscribed,
    Event(ChangeEvent),
    Failure { code: ErrorCode, message: String },
}

impl Response {
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Failure {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for Response {
    fn from(err: StoreError) -> Self {
        Response::failure(err.code(), err.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds the {max}-byte limit", max = MAX_FRAME_BYTES)]
    TooLarge { len: usize },
    #[error("frame codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Serializes `message` into a length-prefixed frame.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
    let payload_len = bincode::serialized_size(message)? as usize;
    if payload_len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge { len: payload_len });
    }
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload_len);
    frame.extend_from_slice(&(payload_len as u32).to_le_bytes());
    bincode::serialize_into(&mut frame, message)?;
    Ok(frame)
}

/// Validates a frame header and returns the payload length.
pub fn payload_len(header: [u8; FRAME_HEADER_LEN]) -> Result<usize, FrameError> {
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge { len });
    }
    Ok(len)
}

pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FrameError> {
    Ok(bincode::deserialize(payload)?)
}

pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), FrameError> {
    let frame = encode_frame(message)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the stream between
/// frames.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, FrameError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let len = payload_len(header)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    decode_payload(&payload).map(Some)
}
