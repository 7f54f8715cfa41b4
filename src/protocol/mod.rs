//! Wire protocol
//!
//! This module defines the messages exchanged over TCP between the three
//! process roles. The protocol uses MessagePack (rmp-serde) for efficient
//! binary serialization with full serde feature support.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! ```text
//! Client                        Master                        Worker
//!   |                             |                             |
//!   |                             |<------ AddWorker -----------|
//!   |                             |------- WorkerAdded -------->|
//!   |                             |                             |
//!   |-- CalculatePi(points) ----->|                             |
//!   |                             |------- CountPoints -------->|
//!   |                             |<------ PointsCounted -------|
//!   |<------ Estimate ------------|                             |
//!   |                             |                             |
//!   |                             |--------- Ping ------------->|   (every probe cycle)
//!   |                             |<-------- Pong --------------|
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Master and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum accepted message size (guards against corrupt length prefixes)
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Request sent to the master
///
/// Issued by the interactive client and, for membership operations, by
/// workers registering or deregistering themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterRequest {
    /// Estimate pi from `total_points` samples spread over the worker pool.
    ///
    /// `total_points = -1` is the flush sentinel: finalize the current stats
    /// tier (test mode) and return 0.0 without sampling anything.
    CalculatePi {
        total_points: i64,
        is_test: bool,
    },

    /// Register a worker under a unique name.
    ///
    /// `addr` is the socket address the master should dial for probe and
    /// sampling calls. Registration of an already-present name is refused.
    AddWorker {
        protocol_version: u32,
        name: String,
        addr: String,
    },

    /// Remove a worker from the pool by name.
    RemoveWorker {
        name: String,
    },

    /// Number of workers currently registered.
    GetWorkerCount,
}

/// Response sent by the master
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterResponse {
    /// Estimate result. A failed or unservable request reports 0.0.
    Estimate {
        estimation: f64,
    },

    /// Whether AddWorker inserted the name (false: already present).
    WorkerAdded {
        added: bool,
    },

    /// Whether RemoveWorker found and removed the name.
    WorkerRemoved {
        removed: bool,
    },

    /// Current pool size.
    WorkerCount {
        count: u64,
    },

    /// Request could not be processed (e.g. protocol version mismatch).
    Error {
        message: String,
    },
}

/// Request sent by the master to a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerRequest {
    /// Liveness probe. No semantic side effect.
    Ping,

    /// Sample `num_points` random points, reply with the in-circle count.
    CountPoints {
        num_points: u64,
    },
}

/// Response sent by a worker to the master
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerResponse {
    /// Liveness probe answer.
    Pong,

    /// In-circle count for a CountPoints request.
    PointsCounted {
        in_circle: u64,
    },

    /// Worker-side failure description.
    Error {
        message: String,
    },
}

/// Serialize a message to bytes
///
/// Uses MessagePack and prepends a 4-byte length field for framing.
pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg)
        .context("Failed to serialize message")?;

    // Prepend length field
    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from bytes
///
/// Expects a 4-byte length prefix followed by a MessagePack-serialized message.
///
/// # Returns
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message<T: DeserializeOwned>(buf: &[u8]) -> Result<(T, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read a complete message from a TCP stream
///
/// Reads the length prefix, then reads the complete message body.
pub async fn read_message<T: DeserializeOwned>(stream: &mut TcpStream) -> Result<T> {
    // Read length field (4 bytes)
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;

    if msg_len > MAX_MESSAGE_BYTES {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_len, MAX_MESSAGE_BYTES);
    }

    // Read message body
    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf)
        .context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to a TCP stream
///
/// Serializes the message with length prefix, writes, and flushes.
pub async fn write_message<T: Serialize>(stream: &mut TcpStream, msg: &T) -> Result<()> {
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .context("Failed to write message")?;

    // Flush to ensure the message is sent immediately
    stream.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize_calculate_pi() {
        let msg = MasterRequest::CalculatePi {
            total_points: 1_000_000,
            is_test: true,
        };

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed): (MasterRequest, usize) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            MasterRequest::CalculatePi { total_points, is_test } => {
                assert_eq!(total_points, 1_000_000);
                assert!(is_test);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_flush_sentinel() {
        let msg = MasterRequest::CalculatePi {
            total_points: -1,
            is_test: true,
        };

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, _): (MasterRequest, usize) = deserialize_message(&bytes).unwrap();

        match deserialized {
            MasterRequest::CalculatePi { total_points, .. } => {
                assert_eq!(total_points, -1);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_add_worker() {
        let msg = MasterRequest::AddWorker {
            protocol_version: PROTOCOL_VERSION,
            name: "worker1".to_string(),
            addr: "10.0.1.10:10001".to_string(),
        };

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed): (MasterRequest, usize) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            MasterRequest::AddWorker { protocol_version, name, addr } => {
                assert_eq!(protocol_version, PROTOCOL_VERSION);
                assert_eq!(name, "worker1");
                assert_eq!(addr, "10.0.1.10:10001");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_worker_messages() {
        let bytes = serialize_message(&WorkerRequest::CountPoints { num_points: 250_000 }).unwrap();
        let (deserialized, _): (WorkerRequest, usize) = deserialize_message(&bytes).unwrap();

        match deserialized {
            WorkerRequest::CountPoints { num_points } => assert_eq!(num_points, 250_000),
            _ => panic!("Wrong message type"),
        }

        let bytes = serialize_message(&WorkerResponse::PointsCounted { in_circle: 196_350 }).unwrap();
        let (deserialized, _): (WorkerResponse, usize) = deserialize_message(&bytes).unwrap();

        match deserialized {
            WorkerResponse::PointsCounted { in_circle } => assert_eq!(in_circle, 196_350),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_ping_pong() {
        let bytes = serialize_message(&WorkerRequest::Ping).unwrap();
        let (deserialized, _): (WorkerRequest, usize) = deserialize_message(&bytes).unwrap();
        assert!(matches!(deserialized, WorkerRequest::Ping));

        let bytes = serialize_message(&WorkerResponse::Pong).unwrap();
        let (deserialized, _): (WorkerResponse, usize) = deserialize_message(&bytes).unwrap();
        assert!(matches!(deserialized, WorkerResponse::Pong));
    }

    #[test]
    fn test_message_framing() {
        let msg = MasterRequest::GetWorkerCount;
        let bytes = serialize_message(&msg).unwrap();

        // Check length prefix
        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);
    }

    #[test]
    fn test_incomplete_buffer_rejected() {
        let msg = MasterResponse::Estimate { estimation: 3.141592 };
        let bytes = serialize_message(&msg).unwrap();

        let err = deserialize_message::<MasterResponse>(&bytes[..bytes.len() - 1]);
        assert!(err.is_err());

        let err = deserialize_message::<MasterResponse>(&bytes[..2]);
        assert!(err.is_err());
    }
}
