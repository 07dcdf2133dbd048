//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_error_catcher::catcher::attributes::{Attribute, AttributeError, ReservePolicy};
use http_error_catcher::config::{EventFields, LogFormat, MonitoringTarget, Settings, Transport};
use http_error_catcher::lifecycle::{self, Shutdown};
use http_error_catcher::net::listener::ListenerError;
use http_error_catcher::riemann::proto::{Event, Msg};
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

/// Stand-in for a Riemann server speaking the framed TCP protocol.
#[derive(Clone)]
pub struct MockCollector {
    pub addr: SocketAddr,
    events: Arc<Mutex<Vec<Event>>>,
    drop_connections: Arc<AtomicBool>,
}

impl MockCollector {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let collector = Self {
            addr: listener.local_addr().unwrap(),
            events: Arc::new(Mutex::new(Vec::new())),
            drop_connections: Arc::new(AtomicBool::new(false)),
        };

        let shared = collector.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let shared = shared.clone();
                tokio::spawn(async move { shared.serve(socket).await });
            }
        });
        collector
    }

    async fn serve(&self, mut socket: TcpStream) {
        loop {
            let len = match socket.read_u32().await {
                Ok(len) => len as usize,
                Err(_) => return,
            };
            let mut buf = vec![0u8; len];
            if socket.read_exact(&mut buf).await.is_err() {
                return;
            }
            if self.drop_connections.load(Ordering::SeqCst) {
                return;
            }

            let msg = Msg::decode(buf.as_slice()).unwrap();
            self.events.lock().unwrap().extend(msg.events);

            let ack = Msg::ack().encode_to_vec();
            socket.write_u32(ack.len() as u32).await.unwrap();
            socket.write_all(&ack).await.unwrap();
        }
    }

    /// Close every connection after reading a frame, without acking.
    pub fn fail_deliveries(&self) {
        self.drop_connections.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

/// Receive one datagram and decode it.
pub async fn recv_datagram(socket: &UdpSocket) -> Msg {
    let mut buf = vec![0u8; 65536];
    let n = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("no datagram received")
        .unwrap();
    Msg::decode(&buf[..n]).unwrap()
}

/// Settings pointing at `collector`, listening on an ephemeral port.
pub fn settings(collector: SocketAddr, transport: Transport) -> Settings {
    Settings {
        listen_address: "127.0.0.1:0".parse().unwrap(),
        max_connections: 64,
        shutdown_grace: Duration::from_secs(2),
        monitoring: MonitoringTarget {
            host: collector.ip().to_string(),
            port: collector.port(),
            transport,
            send_timeout: Duration::from_secs(2),
        },
        event: EventFields {
            host: "catcher.test".into(),
            service: "http_error_catcher".into(),
        },
        maintenance_page: None,
        log_format: LogFormat::Pretty,
        metrics_address: None,
    }
}

/// A catcher running on a background task.
pub struct Running {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ListenerError>>,
}

pub async fn start_catcher(settings: &Settings) -> Running {
    let catcher = lifecycle::start(settings).await.unwrap();
    let addr = catcher.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(catcher.run(shutdown.subscribe()));
    Running {
        addr,
        shutdown,
        task,
    }
}

/// Raw HTTP exchange on a fresh connection. Returns everything the server
/// wrote before closing; empty if it closed without replying.
pub async fn send_raw(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("server did not close the connection")
        .unwrap_or(0);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Split a raw response into status line, lowercase header lines and body.
pub fn parse_response(raw: &str) -> (String, Vec<String>, String) {
    let (head, body) = raw.split_once("\r\n\r\n").expect("incomplete response");
    let mut lines = head.split("\r\n");
    let status = lines.next().unwrap_or_default().to_string();
    let headers = lines.map(|l| l.to_ascii_lowercase()).collect();
    (status, headers, body.to_string())
}

/// Key/value pairs of an event's attributes.
pub fn attribute_pairs(event: &Event) -> Vec<(String, String)> {
    event
        .attributes
        .iter()
        .map(|a| (a.key.clone(), a.value.clone().unwrap_or_default()))
        .collect()
}

/// Refuses to grow a list beyond `limit` entries.
pub struct CappedReserve(pub usize);

impl ReservePolicy for CappedReserve {
    fn reserve(
        &self,
        entries: &mut Vec<Attribute<'_>>,
        additional: usize,
    ) -> Result<(), AttributeError> {
        if entries.len() + additional > self.0 {
            return Err(AttributeError::Exhausted {
                appended: entries.len(),
            });
        }
        entries.reserve_exact(additional);
        Ok(())
    }
}
