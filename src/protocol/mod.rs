//! Protocol module - framing and envelope types.
//!
//! The wire unit is a frame: a 4-byte big-endian length prefix followed by
//! that many payload bytes. Frame bodies carry MessagePack envelopes:
//! `[method, args]` requests and `[status, payload]` responses.

mod envelope;
mod framing;

pub use envelope::{CallArgs, Request, Response, STATUS_ERROR, STATUS_OK};
pub use framing::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN, LEN_PREFIX_SIZE};
