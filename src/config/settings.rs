//! Validated, immutable runtime settings.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{LogFormat, Transport};

/// Everything the process needs after validation. Never mutated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_address: SocketAddr,
    pub max_connections: usize,
    pub shutdown_grace: Duration,
    pub monitoring: MonitoringTarget,
    pub event: EventFields,
    pub maintenance_page: Option<PathBuf>,
    pub log_format: LogFormat,
    pub metrics_address: Option<SocketAddr>,
}

/// Where and how events are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringTarget {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub send_timeout: Duration,
}

/// Host and service stamped on every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub host: String,
    pub service: String,
}
