//! Calculator worker - the classic three-method table.
//!
//! Serves `mult`, `div` and `file` over the framed MessagePack protocol.
//!
//! # Running
//!
//! ```sh
//! cargo run --example calc -- 9999
//! ```
//!
//! A request like `["mult", [3, 4]]` (length-prefixed msgpack) yields
//! `["OK", 12]`; `["div", [10, 0]]` yields `["error", "division by zero"]`.

use serde::Deserialize;
use serde_bytes::ByteBuf;
use wirecall::{RpcError, Server};

#[derive(Deserialize)]
struct MultArgs {
    a: i64,
    b: i64,
}

#[derive(Deserialize)]
struct DivArgs {
    a: f64,
    b: f64,
}

#[derive(Deserialize)]
struct FileArgs {
    fname: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(9999);

    let mut server = Server::builder()
        .handle("mult", |args: MultArgs| async move { Ok(args.a * args.b) })
        .handle("div", |args: DivArgs| async move {
            if args.b == 0.0 {
                return Err(RpcError::Handler("division by zero".to_string()));
            }
            Ok(args.a / args.b)
        })
        .handle("file", |args: FileArgs| async move {
            let contents = tokio::fs::read(&args.fname)
                .await
                .map_err(|e| RpcError::Handler(format!("{}: {e}", args.fname)))?;
            Ok(ByteBuf::from(contents))
        })
        .build();

    let addr = server.run(port).await?;
    println!("RPC server listening on {addr}");

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}
