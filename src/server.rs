//! Server builder and runtime loops.
//!
//! The [`ServerBuilder`] provides a fluent API for registering handlers and
//! building the server. The [`Server`] manages the lifecycle:
//! 1. Bind the listener with address reuse
//! 2. Spawn the accept loop on its own task
//! 3. Serve each accepted connection on its own task
//! 4. Stop cooperatively via a shutdown channel
//!
//! Within one connection requests are strictly sequential: read a frame,
//! handle it, write the response, repeat. Connections are independent of
//! each other.
//!
//! # Example
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
//!     server.run(9999).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{Result, RpcError};
use crate::handler::{HandlerRegistry, RequestHandler};
use crate::protocol::{read_frame, write_frame, Response, DEFAULT_MAX_FRAME_LEN};

/// Greeting written raw (no length prefix) right after accept.
pub const BANNER: &[u8] = b"RPC srv 1.0\n";

/// Default maximum concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Listen backlog for the bound socket.
const LISTEN_BACKLOG: u32 = 1024;

/// Error payload for a request frame above the configured maximum.
const CMD_TOO_LONG: &str = "CMD too long";

/// Error payload for a response frame above the configured maximum.
const RESP_TOO_LONG: &str = "RESP too long";

/// Configuration for a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum frame length, shared by reads and writes.
    pub max_frame_len: u32,
    /// Maximum concurrent connections; further peers are refused.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Builder for configuring and creating a [`Server`].
pub struct ServerBuilder {
    registry: HandlerRegistry,
    config: ServerConfig,
}

impl ServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: ServerConfig::default(),
        }
    }

    /// Register a method handler.
    ///
    /// The handler's parameter type decides how arguments bind: a
    /// positional array binds fields in declaration order, a keyword map
    /// binds fields by name.
    pub fn handle<F, T, R, Fut>(mut self, method: &str, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.registry.register(method, handler);
        self
    }

    /// Set the maximum frame length (default 1000).
    pub fn max_frame_len(mut self, max: u32) -> Self {
        self.config.max_frame_len = max;
        self
    }

    /// Set the maximum number of concurrent connections (default 256).
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.config.max_connections = limit;
        self
    }

    /// Build the server. The dispatch table is frozen from here on.
    pub fn build(self) -> Server {
        Server {
            handler: RequestHandler::new(Arc::new(self.registry)),
            config: self.config,
            running: None,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State held while the accept loop is live.
struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A framed RPC server instance.
///
/// Owns its listening socket and accept task; there is no process-wide
/// state, so independent instances can coexist.
pub struct Server {
    handler: RequestHandler,
    config: ServerConfig,
    running: Option<Running>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Bind `0.0.0.0:port` and start accepting connections.
    ///
    /// Returns the bound address (useful with port 0). The accept loop runs
    /// on its own task until [`stop`](Self::stop) is called or the server
    /// is dropped.
    ///
    /// # Errors
    ///
    /// - [`RpcError::AlreadyRunning`] if this instance already runs
    /// - [`RpcError::Io`] if the bind fails
    pub async fn run(&mut self, port: u16) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(RpcError::AlreadyRunning);
        }

        // 1. Bind with address reuse
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        let local_addr = listener.local_addr()?;

        // 2. Spawn the accept loop
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handler = self.handler.clone();
        let config = self.config.clone();
        let task = tokio::spawn(accept_loop(listener, handler, config, shutdown_rx));

        tracing::debug!(%local_addr, "server listening");
        self.running = Some(Running {
            local_addr,
            shutdown: shutdown_tx,
            task,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already in flight drain naturally; they are not
    /// interrupted mid-call. Idempotent.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await {
            tracing::warn!("accept loop task failed: {e}");
        }
        tracing::debug!("server stopped");
    }

    /// The bound address, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Check whether the accept loop is live.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // A dropped server must not leave its accept task listening.
        if let Some(running) = &self.running {
            running.task.abort();
        }
    }
}

/// Accept loop: owns the listener, spawns one task per connection.
async fn accept_loop(
    listener: TcpListener,
    handler: RequestHandler,
    config: ServerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(config.max_connections));

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!("accept failed: {e}");
                        continue;
                    }
                };

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        // Dropping the stream refuses the connection.
                        tracing::warn!(%peer, "connection capacity reached, refusing");
                        continue;
                    }
                };

                tracing::debug!(%peer, "connection accepted");
                let handler = handler.clone();
                let max_frame_len = config.max_frame_len;
                tokio::spawn(async move {
                    // Permit is held until this connection closes.
                    let _permit = permit;
                    serve_connection(stream, handler, max_frame_len).await;
                    tracing::debug!(%peer, "connection closed");
                });
            }
        }
    }
}

/// Serve one connection: banner, then sequential request/response frames.
async fn serve_connection(mut stream: TcpStream, handler: RequestHandler, max_frame_len: u32) {
    // Greeting: raw banner, no length prefix.
    if let Err(e) = stream.write_all(BANNER).await {
        tracing::warn!("failed to send banner: {e}");
        return;
    }

    loop {
        match read_frame(&mut stream, max_frame_len).await {
            Ok(Some(frame)) => {
                let response = handler.handle(&frame).await;
                match write_frame(&mut stream, &response, max_frame_len).await {
                    Ok(()) => {}
                    Err(RpcError::FrameTooLong { .. }) => {
                        // Success payload exceeded the shared maximum; the
                        // connection stays usable.
                        if send_error(&mut stream, RESP_TOO_LONG, max_frame_len)
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("write failed: {e}");
                        return;
                    }
                }
            }
            // Peer closed at a frame boundary.
            Ok(None) => return,
            Err(RpcError::FrameTooLong { len, max }) => {
                // The declared body was never read; report and close so the
                // unread bytes cannot be misread as a new length prefix.
                tracing::warn!(len, max, "oversize request frame");
                let _ = send_error(&mut stream, CMD_TOO_LONG, max_frame_len).await;
                return;
            }
            Err(e) => {
                tracing::debug!("read failed: {e}");
                return;
            }
        }
    }
}

async fn send_error(stream: &mut TcpStream, message: &str, max_frame_len: u32) -> Result<()> {
    let bytes = Response::Error(message.to_string()).encode()?;
    write_frame(stream, &bytes, max_frame_len).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ServerBuilder::new();
        assert_eq!(builder.config.max_frame_len, DEFAULT_MAX_FRAME_LEN);
        assert_eq!(builder.config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Server::builder().max_frame_len(4096).max_connections(8);
        assert_eq!(builder.config.max_frame_len, 4096);
        assert_eq!(builder.config.max_connections, 8);
    }

    #[test]
    fn test_builder_registers_handlers() {
        let builder = Server::builder()
            .handle("mult", |args: (i64, i64)| async move { Ok(args.0 * args.1) })
            .handle("neg", |args: (i64,)| async move { Ok(-args.0) });

        assert!(builder.registry.contains("mult"));
        assert!(builder.registry.contains("neg"));
        assert_eq!(builder.registry.len(), 2);
    }

    #[tokio::test]
    async fn test_run_twice_is_lifecycle_error() {
        let mut server = Server::builder().build();
        server.run(0).await.unwrap();

        let err = server.run(0).await.unwrap_err();
        assert!(matches!(err, RpcError::AlreadyRunning));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut server = Server::builder().build();
        server.run(0).await.unwrap();
        assert!(server.is_running());

        server.stop().await;
        assert!(!server.is_running());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_run_returns_bound_addr() {
        let mut server = Server::builder().build();
        let addr = server.run(0).await.unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut server = Server::builder().build();
        server.run(0).await.unwrap();
        server.stop().await;

        // A full teardown permits a fresh run.
        server.run(0).await.unwrap();
        server.stop().await;
    }
}
