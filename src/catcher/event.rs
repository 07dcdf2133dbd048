//! Monitoring events and the client contract used to deliver them.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::catcher::attributes::AttributeList;
use crate::config::Transport;

/// Structured record describing one caught request.
///
/// Only the host, service and attributes are ever populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringEvent<'a> {
    pub host: &'a str,
    pub service: &'a str,
    pub attributes: AttributeList<'a>,
}

/// Errors returned by an [`EventClient`] send.
#[derive(Debug, Error)]
pub enum SendError {
    /// Socket level failure (connect, write, read).
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The exchange did not finish within the configured timeout.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// The collector answered with a negative acknowledgement.
    #[error("collector rejected event: {0}")]
    Rejected(String),

    /// The collector's reply could not be decoded.
    #[error("malformed acknowledgement: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The collector announced a reply larger than we accept.
    #[error("acknowledgement of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Encoded event does not fit into a single datagram.
    #[error("encoded event of {len} bytes exceeds datagram limit of {max} bytes")]
    DatagramTooLarge { len: usize, max: usize },

    /// The collector host name resolved to no address.
    #[error("could not resolve collector address {0}")]
    Resolve(String),

    /// The client was closed during shutdown.
    #[error("collector transport is closed")]
    Closed,
}

/// Delivery capability for monitoring events.
///
/// One client is created at startup and shared by every connection task, so
/// implementations must be safe for concurrent `send` calls: either the
/// underlying socket tolerates concurrent use or the client serializes access
/// itself.
#[async_trait]
pub trait EventClient: Send + Sync {
    /// Transport this client delivers over, used as a log and metric label.
    fn transport(&self) -> Transport;

    /// Deliver a single event. Failures are never retried.
    async fn send(&self, event: &MonitoringEvent<'_>) -> Result<(), SendError>;

    /// Release the transport. Called once during shutdown; later sends fail
    /// with [`SendError::Closed`].
    async fn close(&self) {}
}
