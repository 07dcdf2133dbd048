//! Riemann over UDP.
//!
//! One encoded message per datagram and no acknowledgement. The socket is
//! connected once at startup. Sends share a read lock, so they still run
//! concurrently; `close` takes the write lock and drops the socket.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::catcher::event::{EventClient, MonitoringEvent, SendError};
use crate::config::{MonitoringTarget, Transport};
use crate::riemann::proto::Msg;
use crate::riemann::resolve;

/// Largest datagram the collector accepts by default.
pub const MAX_DATAGRAM_LEN: usize = 16384;

/// Event client delivering one datagram per event.
pub struct UdpClient {
    socket: RwLock<Option<UdpSocket>>,
    peer: SocketAddr,
    send_timeout: Duration,
}

impl UdpClient {
    pub async fn connect(target: &MonitoringTarget) -> Result<Self, SendError> {
        let peer = resolve(&target.host, target.port).await?;
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        tracing::info!(
            host = %target.host,
            peer = %peer,
            "Sending events to collector over udp"
        );

        Ok(Self {
            socket: RwLock::new(Some(socket)),
            peer,
            send_timeout: target.send_timeout,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl EventClient for UdpClient {
    fn transport(&self) -> Transport {
        Transport::Udp
    }

    async fn send(&self, event: &MonitoringEvent<'_>) -> Result<(), SendError> {
        let payload = Msg::with_event(event).encode_to_vec();
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(SendError::DatagramTooLarge {
                len: payload.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }

        let guard = self.socket.read().await;
        let socket = guard.as_ref().ok_or(SendError::Closed)?;
        timeout(self.send_timeout, socket.send(&payload))
            .await
            .map_err(|_| SendError::Timeout(self.send_timeout))??;
        Ok(())
    }

    async fn close(&self) {
        if self.socket.write().await.take().is_some() {
            tracing::info!(peer = %self.peer, "Collector socket released");
        }
    }
}
