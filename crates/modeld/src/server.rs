//! TCP accept loop and per-connection request handling

use std::future::Future;

use anyhow::Result;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::handler::CommandHandler;
use crate::resp::Frame;

/// Accept connections until `shutdown` resolves
pub async fn serve<S>(listener: TcpListener, handler: CommandHandler, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let handler = handler.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            error!("Error handling client {}: {}", addr, e);
                        }
                        info!("Connection closed: {}", addr);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, handler: CommandHandler) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);
    let mut out = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        loop {
            match Frame::decode(&mut buffer) {
                Ok(Some(cmd)) => {
                    handler.handle(cmd).await.encode(&mut out);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Protocol error: {}", e);
                    Frame::err(e).encode(&mut out);
                    buffer.clear();
                    break;
                }
            }
        }

        if !out.is_empty() {
            stream.write_all(&out).await?;
            out.clear();
        }
    }
}
