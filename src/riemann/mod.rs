//! Riemann event delivery.
//!
//! # Data Flow
//! ```text
//! MonitoringEvent (borrowed attributes)
//!     → proto.rs (owned protobuf Msg with one Event)
//!     → tcp.rs (length-prefixed frame, wait for ack)
//!       or udp.rs (single datagram, no ack)
//! ```
//!
//! # Design Decisions
//! - The transport is chosen once at startup and shared process-wide
//! - Startup fails if the collector cannot be reached (TCP) or resolved
//! - No retries: a failed event is logged by the caller and forgotten

pub mod proto;
pub mod tcp;
pub mod udp;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::catcher::event::{EventClient, SendError};
use crate::config::{MonitoringTarget, Transport};

pub use tcp::TcpClient;
pub use udp::UdpClient;

/// Open the configured transport.
pub async fn connect(target: &MonitoringTarget) -> Result<Arc<dyn EventClient>, SendError> {
    let client: Arc<dyn EventClient> = match target.transport {
        Transport::Tcp => Arc::new(TcpClient::connect(target).await?),
        Transport::Udp => Arc::new(UdpClient::connect(target).await?),
    };
    Ok(client)
}

/// Resolve `host:port` to the first address returned.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<SocketAddr, SendError> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| SendError::Resolve(format!("{}:{}", host, port)))
}
