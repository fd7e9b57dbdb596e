//! The request boundary: one frame in, one response frame out.
//!
//! Every per-request failure - codec, envelope shape, unknown method,
//! argument binding, handler - is converted here into a well-formed error
//! envelope. Nothing escapes to break the connection loop; only the
//! transport itself can do that.

use std::sync::Arc;

use rmpv::Value;

use crate::error::Result;
use crate::handler::HandlerRegistry;
use crate::protocol::{Request, Response};

/// Handles decoded request frames against a shared registry.
///
/// Cheaply cloneable; every connection task holds one.
#[derive(Clone)]
pub struct RequestHandler {
    registry: Arc<HandlerRegistry>,
}

impl RequestHandler {
    /// Create a request handler over a registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Process one request frame and return the encoded response frame.
    ///
    /// Infallible at this boundary: failures become `("error", message)`
    /// envelopes, successes become `("OK", value)`.
    pub async fn handle(&self, frame: &[u8]) -> Vec<u8> {
        let response = match self.process(frame).await {
            Ok(value) => Response::Ok(value),
            Err(err) => {
                tracing::debug!("request failed: {err}");
                Response::error(err)
            }
        };

        match response.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!("failed to encode response: {err}");
                // A plain string envelope always encodes.
                Response::error(err).encode().unwrap_or_default()
            }
        }
    }

    async fn process(&self, frame: &[u8]) -> Result<Value> {
        let request = Request::decode(frame)?;
        self.registry.dispatch(&request.method, request.args).await
    }
}
