//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or an environment variable; the flag
//! wins. Both override values from the optional config file.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{CatcherConfig, LogFormat, Transport};

/// Printed after validation errors.
pub const USAGE: &str = "Usage: http-error-catcher -l 9000 -r localhost [-p 5555] -h example.com \
[-s http_error_catcher] [-m maintenance.html] [-t tcp|udp] [-b 127.0.0.1] [-c catcher.toml]";

#[derive(Debug, Default, Parser)]
#[command(
    name = "http-error-catcher",
    version,
    about = "Reports every request it receives to Riemann and answers 200",
    disable_help_flag = true
)]
pub struct Cli {
    /// Print help (-h is the event host field)
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// TOML config file used as the base layer
    #[arg(short = 'c', long, env = "CATCHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'l', long, env = "LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// Address to bind the listener to
    #[arg(short = 'b', long, env = "LISTEN_ADDRESS")]
    pub bind_address: Option<IpAddr>,

    /// Riemann collector host
    #[arg(short = 'r', long, env = "RIEMANN_HOST")]
    pub riemann_host: Option<String>,

    /// Riemann collector port [default: 5555]
    #[arg(short = 'p', long, env = "RIEMANN_PORT")]
    pub riemann_port: Option<u16>,

    /// Transport towards the collector [default: tcp]
    #[arg(short = 't', long, env = "RIEMANN_TRANSPORT", value_enum)]
    pub transport: Option<Transport>,

    /// Upper bound for one event send, in milliseconds [default: 5000]
    #[arg(long, env = "RIEMANN_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: Option<u64>,

    /// Service field of every event [default: http_error_catcher]
    #[arg(short = 's', long, env = "RIEMANN_FIELD_SERVICE")]
    pub service: Option<String>,

    /// Host field of every event
    #[arg(short = 'h', long, env = "RIEMANN_FIELD_HOST")]
    pub host: Option<String>,

    /// Page served instead of the literal reply
    #[arg(short = 'm', long, env = "MAINTAINANCE_PAGE")]
    pub maintenance_page: Option<PathBuf>,

    /// Maximum concurrent connections [default: 1024]
    #[arg(long, env = "MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Seconds to wait for in-flight requests on shutdown [default: 10]
    #[arg(long, env = "SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: Option<u64>,

    /// Log output format [default: pretty]
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Address for the Prometheus scrape endpoint
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Build the merged, unvalidated configuration.
    pub fn into_config(self) -> Result<CatcherConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => CatcherConfig::default(),
        };
        Ok(self.overlay(base))
    }

    /// Apply every value given on the command line or in the environment.
    pub fn overlay(self, mut config: CatcherConfig) -> CatcherConfig {
        if let Some(port) = self.listen_port {
            config.listener.port = Some(port);
        }
        if let Some(addr) = self.bind_address {
            config.listener.bind_address = addr;
        }
        if let Some(max) = self.max_connections {
            config.listener.max_connections = max;
        }
        if let Some(secs) = self.shutdown_grace_secs {
            config.listener.shutdown_grace_secs = secs;
        }
        if let Some(host) = self.riemann_host {
            config.monitoring.host = Some(host);
        }
        if let Some(port) = self.riemann_port {
            config.monitoring.port = port;
        }
        if let Some(transport) = self.transport {
            config.monitoring.transport = transport;
        }
        if let Some(ms) = self.send_timeout_ms {
            config.monitoring.send_timeout_ms = ms;
        }
        if let Some(service) = self.service {
            config.event.service = service;
        }
        if let Some(host) = self.host {
            config.event.host = Some(host);
        }
        if let Some(page) = self.maintenance_page {
            config.maintenance_page = Some(page);
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
        config
    }
}
