//! Error types for wirecall.

use thiserror::Error;

/// Main error type for all wirecall operations.
///
/// Per-request variants (`InvalidRequest`, `MethodNotFound`,
/// `InvalidArguments`, `Handler`) are turned into error envelopes at the
/// request-handler boundary; their `Display` output is exactly what the peer
/// receives as the error payload.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Protocol error (malformed envelope on the receiving side of a
    /// response, invalid banner, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request envelope violates the wire contract (wrong arity, wrong
    /// argument container). The message is the exact wire diagnostic.
    #[error("{0}")]
    InvalidRequest(String),

    /// No handler registered under the requested method name.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Decoded argument values could not be bound to the handler's declared
    /// parameter type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failure reported by the invoked handler itself.
    #[error("{0}")]
    Handler(String),

    /// A frame's declared length exceeds the configured maximum.
    #[error("frame of {len} bytes exceeds maximum {max}")]
    FrameTooLong {
        /// Declared frame length.
        len: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Connection closed before a full frame could be read or written.
    #[error("connection closed")]
    ConnectionClosed,

    /// `run()` called on a server instance that is already running.
    #[error("server already running")]
    AlreadyRunning,
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
