// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed message framing.
//!
//! Every message on the wire is a 32-bit big-endian payload length followed
//! by that many bytes of ASCII text, no trailing newline. Reads and writes
//! are fully looped; a peer that goes away mid-frame surfaces as
//! [`ErrorKind::TransportClosed`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ErrorKind;

/// Send one framed payload.
pub async fn send_frame<W>(writer: &mut W, payload: &str) -> Result<(), ErrorKind>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload.as_bytes());
    writer.write_all(&buf).await.map_err(|_| ErrorKind::TransportClosed)?;
    writer.flush().await.map_err(|_| ErrorKind::TransportClosed)
}

/// Receive one framed payload. Fails with [`ErrorKind::TransportClosed`]
/// when the peer closes before the full length and payload arrive.
pub async fn recv_frame<R>(reader: &mut R) -> Result<String, ErrorKind>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|_| ErrorKind::TransportClosed)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|_| ErrorKind::TransportClosed)?;
    String::from_utf8(payload).map_err(|_| ErrorKind::InvalidMessage)
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
