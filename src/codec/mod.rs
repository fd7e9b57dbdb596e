//! Codec module - MessagePack serialization for envelopes.
//!
//! Everything that crosses the wire is MessagePack. Envelopes are positional
//! pairs, so values are encoded with `rmp_serde::to_vec` (tuples and
//! `rmpv::Value` both serialize to plain msgpack arrays/maps). Dynamic
//! payloads - handler arguments and results whose shape is only known at
//! runtime - are carried as [`rmpv::Value`].
//!
//! # Example
//!
//! ```
//! use wirecall::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&("OK", 12)).unwrap();
//! let decoded: (String, i64) = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, ("OK".to_string(), 12));
//! ```

use crate::error::Result;

/// MessagePack codec for wire envelopes.
///
/// Implemented as a marker struct with static methods so call sites read as
/// `MsgPackCodec::encode(..)` without carrying codec state around.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
