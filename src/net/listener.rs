//! Bounded TCP listener.
//!
//! A connection slot is taken before `accept` is called, so once
//! `max_connections` are open new clients queue in the kernel backlog
//! instead of spawning more tasks.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The slot semaphore was closed.
    #[error("connection slots closed")]
    Closed,
}

/// Listening socket plus the slots that cap concurrent connections.
pub struct Listener {
    socket: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    pub async fn bind(addr: SocketAddr, max_connections: usize) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind { addr, source };
        let socket = TcpListener::bind(addr).await.map_err(bind_error)?;
        let bound = socket.local_addr().map_err(bind_error)?;

        tracing::info!(address = %bound, max_connections, "Listening for caught requests");

        Ok(Self {
            socket,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Wait for a free slot, then for the next client.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;
        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(peer = %peer, free_slots = self.slots.available_permits(), "Accepted");
        Ok((stream, peer, ConnectionPermit { _slot: slot }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.socket.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One occupied connection slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _slot: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn permit_holds_a_slot() {
        let listener = Listener::bind(loopback(), 2).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(listener.max_connections(), 2);

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let first = Listener::bind(loopback(), 1).await.unwrap();
        let taken = first.local_addr().unwrap();

        let err = Listener::bind(taken, 1).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind { addr, .. } if addr == taken));
        assert!(err.to_string().starts_with("cannot listen on"));
    }
}
