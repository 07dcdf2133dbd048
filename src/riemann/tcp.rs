//! Riemann over TCP.
//!
//! # Responsibilities
//! - Hold one persistent connection to the collector
//! - Frame each message with a 4-byte big-endian length prefix
//! - Read and check the collector's acknowledgement
//!
//! # Design Decisions
//! - The stream sits behind an async mutex: one exchange at a time
//! - The send timeout covers waiting for the mutex as well as the exchange
//! - A failed exchange drops the stream; the next event reconnects
//! - The failed event itself is not resent

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::catcher::event::{EventClient, MonitoringEvent, SendError};
use crate::config::{MonitoringTarget, Transport};
use crate::riemann::proto::Msg;
use crate::riemann::resolve;

/// Largest acknowledgement accepted from the collector.
pub const MAX_ACK_LEN: usize = 1024 * 1024;

/// Event client delivering over a shared TCP connection.
pub struct TcpClient {
    host: String,
    port: u16,
    send_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
}

impl TcpClient {
    /// Connect to the collector. Fails if it is unreachable.
    pub async fn connect(target: &MonitoringTarget) -> Result<Self, SendError> {
        let stream = open(&target.host, target.port, target.send_timeout).await?;

        tracing::info!(
            host = %target.host,
            port = target.port,
            "Connected to collector over tcp"
        );

        Ok(Self {
            host: target.host.clone(),
            port: target.port,
            send_timeout: target.send_timeout,
            stream: Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
        })
    }

    async fn exchange(stream: &mut TcpStream, payload: &[u8]) -> Result<(), SendError> {
        let len = u32::try_from(payload.len()).map_err(|_| SendError::FrameTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;
        stream.write_u32(len).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;

        let ack_len = stream.read_u32().await? as usize;
        if ack_len > MAX_ACK_LEN {
            return Err(SendError::FrameTooLarge {
                len: ack_len,
                max: MAX_ACK_LEN,
            });
        }
        let mut buf = vec![0u8; ack_len];
        stream.read_exact(&mut buf).await?;

        let ack = Msg::decode(buf.as_slice())?;
        if ack.ok == Some(true) {
            Ok(())
        } else {
            Err(SendError::Rejected(ack.error.unwrap_or_default()))
        }
    }
}

async fn open(host: &str, port: u16, limit: Duration) -> Result<TcpStream, SendError> {
    let addr: SocketAddr = resolve(host, port).await?;
    let stream = timeout(limit, TcpStream::connect(addr))
        .await
        .map_err(|_| SendError::Timeout(limit))??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[async_trait]
impl EventClient for TcpClient {
    fn transport(&self) -> Transport {
        Transport::Tcp
    }

    async fn send(&self, event: &MonitoringEvent<'_>) -> Result<(), SendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        let payload = Msg::with_event(event).encode_to_vec();
        let limit = self.send_timeout;

        // The stream is taken out while in use and only put back after a
        // complete exchange; a failed or abandoned exchange leaves `None`.
        let exchange = async {
            let mut guard = self.stream.lock().await;
            if self.closed.load(Ordering::Acquire) {
                return Err(SendError::Closed);
            }
            let mut stream = match guard.take() {
                Some(stream) => stream,
                None => {
                    tracing::debug!(host = %self.host, port = self.port, "Reconnecting to collector");
                    open(&self.host, self.port, limit).await?
                }
            };
            Self::exchange(&mut stream, &payload).await?;
            *guard = Some(stream);
            Ok::<(), SendError>(())
        };

        timeout(limit, exchange)
            .await
            .unwrap_or(Err(SendError::Timeout(limit)))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(mut stream) = self.stream.lock().await.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "Collector connection did not shut down cleanly");
            }
        }
        tracing::info!(host = %self.host, port = self.port, "Collector connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catcher::attributes::{AttributeListBuilder, HeapReserve};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::net::TcpListener;

    fn target(addr: SocketAddr) -> MonitoringTarget {
        MonitoringTarget {
            host: addr.ip().to_string(),
            port: addr.port(),
            transport: Transport::Tcp,
            send_timeout: Duration::from_secs(2),
        }
    }

    fn event() -> MonitoringEvent<'static> {
        MonitoringEvent {
            host: "h",
            service: "s",
            attributes: AttributeListBuilder::for_request(&HeapReserve, "GET", "/")
                .unwrap()
                .materialize()
                .unwrap(),
        }
    }

    async fn read_frame(stream: &mut TcpStream) -> Msg {
        let len = stream.read_u32().await.unwrap() as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        Msg::decode(buf.as_slice()).unwrap()
    }

    async fn write_frame(stream: &mut TcpStream, msg: &Msg) {
        let bytes = msg.encode_to_vec();
        stream.write_u32(bytes.len() as u32).await.unwrap();
        stream.write_all(&bytes).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_collector_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(TcpClient::connect(&target(addr)).await.is_err());
    }

    #[tokio::test]
    async fn negative_ack_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let msg = read_frame(&mut stream).await;
            assert_eq!(msg.events.len(), 1);
            write_frame(&mut stream, &Msg::nack("no index")).await;
        });

        let client = TcpClient::connect(&target(addr)).await.unwrap();
        let err = client.send(&event()).await.unwrap_err();
        assert!(matches!(err, SendError::Rejected(ref m) if m == "no index"));
    }

    #[tokio::test]
    async fn reconnects_after_dropped_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // First connection closes without answering.
            let (first, _) = listener.accept().await.unwrap();
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            let _ = read_frame(&mut second).await;
            write_frame(&mut second, &Msg::ack()).await;
        });

        let client = TcpClient::connect(&target(addr)).await.unwrap();
        assert!(client.send(&event()).await.is_err());
        client.send(&event()).await.unwrap();
    }

    #[tokio::test]
    async fn oversized_ack_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_frame(&mut stream).await;
            stream.write_u32((MAX_ACK_LEN + 1) as u32).await.unwrap();
        });

        let client = TcpClient::connect(&target(addr)).await.unwrap();
        let err = client.send(&event()).await.unwrap_err();
        assert!(matches!(err, SendError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn queued_sends_share_one_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });

        let mut t = target(addr);
        t.send_timeout = Duration::from_millis(300);
        let client = Arc::new(TcpClient::connect(&t).await.unwrap());

        let sends: Vec<_> = (0..4)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = client.send(&event()).await;
                    (result, started.elapsed())
                })
            })
            .collect();

        for send in sends {
            let (result, elapsed) = send.await.unwrap();
            assert!(matches!(result, Err(SendError::Timeout(_))));
            assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);
        }
    }

    #[tokio::test]
    async fn closed_client_refuses_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _held = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = TcpClient::connect(&target(addr)).await.unwrap();
        client.close().await;
        assert!(matches!(client.send(&event()).await, Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn silent_collector_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_frame(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut t = target(addr);
        t.send_timeout = Duration::from_millis(200);
        let client = TcpClient::connect(&t).await.unwrap();
        let err = client.send(&event()).await.unwrap_err();
        assert!(matches!(err, SendError::Timeout(_)));
    }
}
