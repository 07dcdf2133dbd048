//! Configuration schema definitions.
//!
//! This module defines the raw configuration as read from a config file and
//! then overlaid with environment variables and flags. Values the process
//! cannot start without are optional here and checked by validation.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the error catcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatcherConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Monitoring collector endpoint.
    pub monitoring: MonitoringConfig,

    /// Fixed fields stamped on every event.
    pub event: EventConfig,

    /// File served instead of the literal reply.
    pub maintenance_page: Option<PathBuf>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind (e.g. "127.0.0.1").
    pub bind_address: IpAddr,

    /// Port to listen on. Required.
    pub port: Option<u16>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Seconds to wait for in-flight connections on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: None,
            max_connections: 1024,
            shutdown_grace_secs: 10,
        }
    }
}

/// Wire transport towards the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Length-prefixed messages over one persistent connection, acknowledged.
    #[default]
    Tcp,
    /// One datagram per event, unacknowledged.
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monitoring collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Collector host name or address. Required.
    pub host: Option<String>,

    /// Collector port.
    pub port: u16,

    /// Transport used to reach the collector.
    pub transport: Transport,

    /// Upper bound for a single send, in milliseconds.
    pub send_timeout_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 5555,
            transport: Transport::Tcp,
            send_timeout_ms: 5000,
        }
    }
}

/// Event field configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    /// Value of the event `service` field.
    pub service: String,

    /// Value of the event `host` field. Required.
    pub host: Option<String>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            service: "http_error_catcher".to_string(),
            host: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus scrape endpoint (e.g. "127.0.0.1:9090"). Disabled when unset.
    pub metrics_address: Option<String>,
}
