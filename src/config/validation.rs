//! Configuration validation.
//!
//! # Responsibilities
//! - Check that every required value is present
//! - Validate value ranges (ports, limits, addresses)
//! - Produce the immutable [`Settings`] the rest of the process runs on
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `&CatcherConfig → Result<Settings, Vec<ValidationError>>`

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::CatcherConfig;
use crate::config::settings::{EventFields, MonitoringTarget, Settings};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port to listen on is not specified (LISTEN_PORT or -l)")]
    MissingListenPort,

    #[error("riemann host is not specified (RIEMANN_HOST or -r)")]
    MissingMonitoringHost,

    #[error("host field for riemann payload is not specified (RIEMANN_FIELD_HOST or -h)")]
    MissingEventHost,

    #[error("riemann port must be between 1 and 65535")]
    InvalidMonitoringPort,

    #[error("service field must not be empty")]
    EmptyService,

    #[error("max connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("send timeout must be greater than zero")]
    ZeroSendTimeout,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Validate a merged configuration and freeze it into [`Settings`].
pub fn validate_config(config: &CatcherConfig) -> Result<Settings, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let port = config.listener.port.filter(|p| *p != 0);
    if port.is_none() {
        errors.push(ValidationError::MissingListenPort);
    }

    let monitoring_host = non_empty(config.monitoring.host.as_deref());
    if monitoring_host.is_none() {
        errors.push(ValidationError::MissingMonitoringHost);
    }

    let event_host = non_empty(config.event.host.as_deref());
    if event_host.is_none() {
        errors.push(ValidationError::MissingEventHost);
    }

    if config.monitoring.port == 0 {
        errors.push(ValidationError::InvalidMonitoringPort);
    }
    if config.event.service.is_empty() {
        errors.push(ValidationError::EmptyService);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.monitoring.send_timeout_ms == 0 {
        errors.push(ValidationError::ZeroSendTimeout);
    }

    let metrics_address = match config.observability.metrics_address.as_deref() {
        Some(raw) => match raw.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                errors.push(ValidationError::InvalidMetricsAddress(raw.to_string()));
                None
            }
        },
        None => None,
    };

    match (port, monitoring_host, event_host) {
        (Some(port), Some(monitoring_host), Some(event_host)) if errors.is_empty() => Ok(Settings {
            listen_address: SocketAddr::new(config.listener.bind_address, port),
            max_connections: config.listener.max_connections,
            shutdown_grace: Duration::from_secs(config.listener.shutdown_grace_secs),
            monitoring: MonitoringTarget {
                host: monitoring_host.to_string(),
                port: config.monitoring.port,
                transport: config.monitoring.transport,
                send_timeout: Duration::from_millis(config.monitoring.send_timeout_ms),
            },
            event: EventFields {
                host: event_host.to_string(),
                service: config.event.service.clone(),
            },
            maintenance_page: config.maintenance_page.clone(),
            log_format: config.observability.log_format,
            metrics_address,
        }),
        _ => Err(errors),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Transport;

    fn complete() -> CatcherConfig {
        let mut config = CatcherConfig::default();
        config.listener.port = Some(9000);
        config.monitoring.host = Some("localhost".into());
        config.event.host = Some("example.com".into());
        config
    }

    #[test]
    fn complete_config_produces_settings() {
        let settings = validate_config(&complete()).unwrap();
        assert_eq!(settings.listen_address, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.monitoring.host, "localhost");
        assert_eq!(settings.monitoring.port, 5555);
        assert_eq!(settings.monitoring.transport, Transport::Tcp);
        assert_eq!(settings.monitoring.send_timeout, Duration::from_secs(5));
        assert_eq!(settings.event.host, "example.com");
        assert_eq!(settings.event.service, "http_error_catcher");
        assert!(settings.metrics_address.is_none());
    }

    #[test]
    fn reports_every_missing_value() {
        let errors = validate_config(&CatcherConfig::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingListenPort,
                ValidationError::MissingMonitoringHost,
                ValidationError::MissingEventHost,
            ]
        );
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let mut config = complete();
        config.monitoring.host = Some(String::new());
        config.listener.port = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingListenPort, ValidationError::MissingMonitoringHost]
        );
    }

    #[test]
    fn range_checks() {
        let mut config = complete();
        config.monitoring.port = 0;
        config.listener.max_connections = 0;
        config.observability.metrics_address = Some("not-an-address".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidMetricsAddress("not-an-address".into())));
    }

    #[test]
    fn error_messages_name_flag_and_variable() {
        assert_eq!(
            ValidationError::MissingEventHost.to_string(),
            "host field for riemann payload is not specified (RIEMANN_FIELD_HOST or -h)"
        );
    }
}
