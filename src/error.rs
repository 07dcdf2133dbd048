//! Crate-level error types.

use thiserror::Error;

use crate::catcher::attributes::AttributeError;
use crate::catcher::event::SendError;
use crate::http::response::BodyError;
use crate::net::listener::ListenerError;

/// Per-request failure. Returning it from the HTTP service makes the
/// connection close without a reply.
#[derive(Debug, Error)]
pub enum CatcherError {
    #[error("request aborted: {0}")]
    Aborted(#[from] AttributeError),

    #[error("request body could not be read: {0}")]
    Body(String),

    #[error("handler finished without queuing a response")]
    NoResponse,
}

/// Fatal error raised before any request is served.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    MaintenancePage(#[from] BodyError),

    #[error("cannot connect to collector: {0}")]
    Collector(#[from] SendError),

    #[error("cannot start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}
