//! # wirecall
//!
//! Minimal framed RPC server over TCP with MessagePack envelopes.
//!
//! A peer connects, receives the greeting banner `RPC srv 1.0\n`, then
//! exchanges frames: a 4-byte big-endian length prefix followed by a
//! MessagePack body. Requests are `[method, args]` pairs where `args` is an
//! array (positional) or a string-keyed map (keyword); responses are
//! `[status, payload]` pairs with status `"OK"` or `"error"`.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): exact-read length-prefixed frames with a
//!   shared maximum length
//! - **Dispatch** ([`handler`]): an immutable name-to-handler table with
//!   serde-typed parameter binding
//! - **Serving** ([`server`]): one accept task, one task per connection,
//!   strictly sequential request/response within a connection
//!
//! ## Example
//!
//! ```ignore
//! use wirecall::Server;
//!
//! #[tokio::main]
//! async fn main() -> wirecall::Result<()> {
//!     let mut server = Server::builder()
//!         .handle("mult", |args: (i64, i64)| async move { Ok(args.0 * args.1) })
//!         .build();
//!
//!     let addr = server.run(9999).await?;
//!     println!("serving on {addr}");
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;

pub use error::{Result, RpcError};
pub use handler::{HandlerRegistry, RequestHandler};
pub use protocol::{CallArgs, Request, Response};
pub use server::{Server, ServerBuilder, ServerConfig, BANNER};
