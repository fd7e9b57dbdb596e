//! Handler module - dispatch table and the request boundary.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps method names to typed handlers
//! - [`RequestHandler`] - decodes a request frame, dispatches it, and
//!   encodes the response envelope
//!
//! # Example
//!
//! ```
//! use wirecall::handler::HandlerRegistry;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct MultArgs {
//!     a: i64,
//!     b: i64,
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("mult", |args: MultArgs| async move { Ok(args.a * args.b) });
//! assert!(registry.contains("mult"));
//! ```

mod registry;
mod request;

pub use registry::{BoxFuture, Handler, HandlerRegistry, TypedHandler};
pub use request::RequestHandler;
