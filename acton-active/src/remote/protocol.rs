/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Frame protocol for remote dispatch.
//!
//! Every payload travels inside a length-prefixed frame.
//!
//! # Wire Format
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Frame Length (4 bytes, big-endian u32, excludes header)       │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Protocol Version (1 byte, currently 0x01)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Message Type (1 byte)                                         │
//! │   0x01 = Request                                              │
//! │   0x02 = Response                                             │
//! │   0x03 = Error                                                │
//! │   0x04 = Heartbeat                                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Payload (JSON, empty for heartbeats)                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::types::{WireRequest, WireResponse, WireStatus};
use crate::common::ActiveError;

/// Protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Message type: Request (caller → listener).
pub const MSG_TYPE_REQUEST: u8 = 0x01;

/// Message type: Response (listener → caller).
pub const MSG_TYPE_RESPONSE: u8 = 0x02;

/// Message type: Error response (listener → caller).
pub const MSG_TYPE_ERROR: u8 = 0x03;

/// Message type: Heartbeat (bidirectional).
pub const MSG_TYPE_HEARTBEAT: u8 = 0x04;

/// Frame header size: 4 bytes length + 1 byte version + 1 byte type.
pub const HEADER_SIZE: usize = 6;

/// Maximum frame size (16 MiB hard limit).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

fn io_error(e: &std::io::Error) -> ActiveError {
    ActiveError::Transport(e.to_string())
}

/// Read a frame header from the stream.
///
/// Returns `None` when the peer closed the connection between frames.
async fn read_header<R>(reader: &mut R) -> Result<Option<(u32, u8)>, ActiveError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error(&e)),
    }

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let version = header[4];
    let msg_type = header[5];

    if version != PROTOCOL_VERSION {
        return Err(ActiveError::Protocol(format!(
            "Unsupported protocol version: {version}, expected {PROTOCOL_VERSION}"
        )));
    }

    if !matches!(
        msg_type,
        MSG_TYPE_REQUEST | MSG_TYPE_RESPONSE | MSG_TYPE_ERROR | MSG_TYPE_HEARTBEAT
    ) {
        return Err(ActiveError::Protocol(format!(
            "Unknown message type: {msg_type:#04x}"
        )));
    }

    Ok(Some((length, msg_type)))
}

/// Read a complete frame from the stream.
///
/// Returns the message type and payload bytes, or `None` once the peer has closed the
/// connection.
///
/// # Errors
///
/// [`ActiveError::Protocol`] for a bad header or an oversized frame,
/// [`ActiveError::Transport`] for I/O failures and truncated frames.
pub async fn read_frame<R>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<(u8, Vec<u8>)>, ActiveError>
where
    R: AsyncRead + Unpin,
{
    let Some((length, msg_type)) = read_header(reader).await? else {
        return Ok(None);
    };
    let length = usize::try_from(length)
        .map_err(|_| ActiveError::Protocol("frame length does not fit in memory".to_string()))?;

    if length > max_size.min(MAX_FRAME_SIZE) {
        return Err(ActiveError::Protocol(format!(
            "Frame size {length} exceeds maximum {}",
            max_size.min(MAX_FRAME_SIZE)
        )));
    }

    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| io_error(&e))?;

    Ok(Some((msg_type, payload)))
}

/// Write a frame to the stream.
///
/// # Errors
///
/// [`ActiveError::Transport`] if the stream fails, [`ActiveError::Protocol`] if the
/// payload is too large to frame.
pub async fn write_frame<W>(writer: &mut W, msg_type: u8, payload: &[u8]) -> Result<(), ActiveError>
where
    W: AsyncWrite + Unpin,
{
    let length: u32 = payload
        .len()
        .try_into()
        .map_err(|_| ActiveError::Protocol("Payload too large for u32".to_string()))?;

    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&length.to_be_bytes());
    header[4] = PROTOCOL_VERSION;
    header[5] = msg_type;

    writer.write_all(&header).await.map_err(|e| io_error(&e))?;
    writer.write_all(payload).await.map_err(|e| io_error(&e))?;
    writer.flush().await.map_err(|e| io_error(&e))
}

/// Write a request frame.
///
/// # Errors
///
/// As [`write_frame`], plus [`ActiveError::Serialization`].
pub async fn write_request<W>(writer: &mut W, request: &WireRequest) -> Result<(), ActiveError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(request)?;
    write_frame(writer, MSG_TYPE_REQUEST, &payload).await
}

/// Write a response frame, typed as an error frame when the call failed.
///
/// # Errors
///
/// As [`write_frame`], plus [`ActiveError::Serialization`].
pub async fn write_response<W>(writer: &mut W, response: &WireResponse) -> Result<(), ActiveError>
where
    W: AsyncWrite + Unpin,
{
    let msg_type = match response.status {
        WireStatus::Ok => MSG_TYPE_RESPONSE,
        WireStatus::Error => MSG_TYPE_ERROR,
    };
    let payload = serde_json::to_vec(response)?;
    write_frame(writer, msg_type, &payload).await
}

/// Write a heartbeat frame.
///
/// # Errors
///
/// As [`write_frame`].
pub async fn write_heartbeat<W>(writer: &mut W) -> Result<(), ActiveError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, MSG_TYPE_HEARTBEAT, &[]).await
}

/// Decode a request payload.
///
/// # Errors
///
/// [`ActiveError::Serialization`] if the payload is not a request.
pub fn decode_request(payload: &[u8]) -> Result<WireRequest, ActiveError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decode a response payload.
///
/// # Errors
///
/// [`ActiveError::Serialization`] if the payload is not a response.
pub fn decode_response(payload: &[u8]) -> Result<WireResponse, ActiveError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Check if a message type is a heartbeat.
#[must_use]
pub const fn is_heartbeat(msg_type: u8) -> bool {
    msg_type == MSG_TYPE_HEARTBEAT
}

/// Check if a message type carries a response.
#[must_use]
pub const fn is_response(msg_type: u8) -> bool {
    matches!(msg_type, MSG_TYPE_RESPONSE | MSG_TYPE_ERROR)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::Invocation;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let request = WireRequest::new("counter", Invocation::new("increment", vec![json!(2)]), false);
        write_request(&mut client, &request).await.unwrap();

        let (msg_type, payload) = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(msg_type, MSG_TYPE_REQUEST);
        assert_eq!(decode_request(&payload).unwrap(), request);
    }

    #[tokio::test]
    async fn test_error_responses_use_the_error_type() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let response = WireResponse::error(9, ActiveError::UnknownInterface("ledger".to_string()));
        write_response(&mut server, &response).await.unwrap();

        let (msg_type, payload) = read_frame(&mut client, 1024).await.unwrap().unwrap();
        assert_eq!(msg_type, MSG_TYPE_ERROR);
        assert!(is_response(msg_type));
        assert_eq!(decode_response(&payload).unwrap(), response);
    }

    #[tokio::test]
    async fn test_heartbeat_has_empty_payload() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_heartbeat(&mut client).await.unwrap();
        let (msg_type, payload) = read_frame(&mut server, 64).await.unwrap().unwrap();
        assert!(is_heartbeat(msg_type));
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, MSG_TYPE_REQUEST, &[b'x'; 100]).await.unwrap();
        let err = read_frame(&mut server, 10).await.unwrap_err();
        assert!(matches!(err, ActiveError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_wrong_version_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0, 0, 0x7f, MSG_TYPE_REQUEST]).await.unwrap();
        let err = read_frame(&mut server, 64).await.unwrap_err();
        assert!(matches!(err, ActiveError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_closed_stream_yields_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert!(read_frame(&mut server, 64).await.unwrap().is_none());
    }
}
