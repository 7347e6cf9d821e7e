//! Live log listener.
//!
//! The script connects back over TCP and writes one log line per message.
//! Lines are re-emitted as tracing events under the `aeflow::host` target
//! and broadcast to subscribers; call [`LogListener::subscribe`] to receive
//! them.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::EngineError;

/// Capacity of the line broadcast channel. Slow subscribers lose lines.
const LINE_CHANNEL_CAPACITY: usize = 256;

pub struct LogListener {
    addr: SocketAddr,
    line_tx: broadcast::Sender<String>,
    task: Option<JoinHandle<()>>,
}

impl LogListener {
    /// Bind an ephemeral port on `host` and start accepting connections.
    pub async fn bind(host: &str) -> Result<Self, EngineError> {
        let listener = TcpListener::bind((host, 0)).await?;
        let addr = listener.local_addr()?;
        tracing::debug!(%addr, "Log listener bound");

        let (line_tx, _) = broadcast::channel(LINE_CHANNEL_CAPACITY);
        let accept_tx = line_tx.clone();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "Host connected to log listener");
                        tokio::spawn(forward_lines(stream, accept_tx.clone()));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Log listener accept failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            addr,
            line_tx,
            task: Some(task),
        })
    }

    /// Receive every line streamed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.line_tx.subscribe()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(addr = %self.addr, "Log listener closed");
        }
    }
}

impl Drop for LogListener {
    fn drop(&mut self) {
        self.close();
    }
}

async fn forward_lines(stream: TcpStream, line_tx: broadcast::Sender<String>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                tracing::info!(target: "aeflow::host", "{line}");
                // No subscribers is fine.
                let _ = line_tx.send(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Log stream ended with error");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
