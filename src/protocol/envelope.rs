//! Request and response envelopes.
//!
//! A request is the MessagePack pair `[method, args]`; a response is the
//! pair `[status, payload]` with `status` one of `"OK"` or `"error"`. When
//! the status is `"error"` the payload is always a human-readable string,
//! never a structured value.
//!
//! Argument containers are validated here into [`CallArgs`], the tagged
//! shape handlers are invoked with: an array applies positionally, a
//! string-keyed map applies by keyword. The two diagnostic strings below
//! are part of the wire contract and must not be reworded.

use rmpv::Value;

use crate::codec::MsgPackCodec;
use crate::error::{Result, RpcError};

/// Wire status for a successful call.
pub const STATUS_OK: &str = "OK";

/// Wire status for a failed call.
pub const STATUS_ERROR: &str = "error";

const WRONG_ARITY: &str = "Wrong number of RPC objects, should be 2: name and arguments";
const WRONG_ARGS: &str = "Wrong type of arguments in RPC, should be list, tuple or dictionary";

fn wrong_args() -> RpcError {
    RpcError::InvalidRequest(WRONG_ARGS.to_string())
}

/// Arguments of a call, tagged by how they bind to handler parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    /// Ordered values, applied positionally.
    Positional(Vec<Value>),
    /// Key-unique named values, applied by keyword.
    Keyword(Vec<(String, Value)>),
}

impl CallArgs {
    /// Validate a decoded argument container.
    ///
    /// Accepts an array (positional) or a map with unique string keys
    /// (keyword). Anything else is an envelope-shape error carrying the
    /// exact wire diagnostic.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(CallArgs::Positional(items)),
            Value::Map(pairs) => {
                let mut fields: Vec<(String, Value)> = Vec::with_capacity(pairs.len());
                for (key, val) in pairs {
                    let key = match key {
                        Value::String(s) => s.into_str().ok_or_else(wrong_args)?,
                        _ => return Err(wrong_args()),
                    };
                    // A map with a repeated key is not a key-unique mapping.
                    if fields.iter().any(|(seen, _)| *seen == key) {
                        return Err(wrong_args());
                    }
                    fields.push((key, val));
                }
                Ok(CallArgs::Keyword(fields))
            }
            _ => Err(wrong_args()),
        }
    }

    /// Convert back into a dynamic value for serde-based binding.
    pub fn into_value(self) -> Value {
        match self {
            CallArgs::Positional(items) => Value::Array(items),
            CallArgs::Keyword(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, val)| (Value::from(key), val))
                    .collect(),
            ),
        }
    }

    /// Number of arguments carried.
    pub fn len(&self) -> usize {
        match self {
            CallArgs::Positional(items) => items.len(),
            CallArgs::Keyword(fields) => fields.len(),
        }
    }

    /// Check if no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Method name to dispatch on.
    pub method: String,
    /// Validated argument container.
    pub args: CallArgs,
}

impl Request {
    /// Decode and validate a request envelope from frame bytes.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Decode`] if the bytes are not valid MessagePack
    /// - [`RpcError::InvalidRequest`] if the envelope is not a two-element
    ///   array, the method name is not a string, or the argument container
    ///   has the wrong shape
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = MsgPackCodec::decode(bytes)?;

        // A non-array envelope cannot have "exactly two elements".
        let Value::Array(items) = value else {
            return Err(RpcError::InvalidRequest(WRONG_ARITY.to_string()));
        };
        if items.len() != 2 {
            return Err(RpcError::InvalidRequest(WRONG_ARITY.to_string()));
        }

        let mut items = items.into_iter();
        let method = match items.next() {
            Some(Value::String(s)) => s
                .into_str()
                .ok_or_else(|| RpcError::InvalidRequest("method name must be a string".into()))?,
            _ => {
                return Err(RpcError::InvalidRequest(
                    "method name must be a string".into(),
                ))
            }
        };
        let args = CallArgs::from_value(items.next().unwrap_or(Value::Nil))?;

        Ok(Request { method, args })
    }
}

/// A response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Successful call carrying the handler's return value.
    Ok(Value),
    /// Failed call carrying a diagnostic string.
    Error(String),
}

impl Response {
    /// Build an error response from any displayable failure.
    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error(err.to_string())
    }

    /// The wire status literal for this response.
    pub fn status(&self) -> &'static str {
        match self {
            Response::Ok(_) => STATUS_OK,
            Response::Error(_) => STATUS_ERROR,
        }
    }

    /// Encode as the `[status, payload]` pair.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Response::Ok(value) => MsgPackCodec::encode(&(STATUS_OK, value)),
            Response::Error(message) => MsgPackCodec::encode(&(STATUS_ERROR, message)),
        }
    }

    /// Decode a response envelope (the client side of the contract).
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Protocol`] if the envelope is not a
    /// `[status, payload]` pair with a known status, or if an error
    /// payload is not a string.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = MsgPackCodec::decode(bytes)?;
        let Value::Array(items) = value else {
            return Err(RpcError::Protocol("response is not an array".into()));
        };
        if items.len() != 2 {
            return Err(RpcError::Protocol(format!(
                "response has {} elements, expected 2",
                items.len()
            )));
        }

        let mut items = items.into_iter();
        let status = items.next();
        let payload = items.next().unwrap_or(Value::Nil);
        match status.as_ref().and_then(Value::as_str) {
            Some(STATUS_OK) => Ok(Response::Ok(payload)),
            Some(STATUS_ERROR) => match payload {
                Value::String(s) => s
                    .into_str()
                    .map(Response::Error)
                    .ok_or_else(|| RpcError::Protocol("error payload must be a string".into())),
                _ => Err(RpcError::Protocol("error payload must be a string".into())),
            },
            _ => Err(RpcError::Protocol("unknown response status".into())),
        }
    }
}
