//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the reply body (maintenance page or literal)
//! - Connect to the collector
//! - Start the optional metrics endpoint
//! - Bind the listener and build the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last, so traffic only arrives when ready

use std::net::SocketAddr;
use std::sync::Arc;

use crate::catcher::event::EventClient;
use crate::catcher::handler::RequestHandler;
use crate::config::Settings;
use crate::error::StartupError;
use crate::http::response::ResponseBody;
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::riemann;

/// A fully started catcher, ready to serve.
pub struct Catcher {
    server: HttpServer,
    client: Arc<dyn EventClient>,
}

impl Catcher {
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.server.local_addr()
    }

    /// Serve until `shutdown` fires, then release the collector transport.
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<(), ListenerError> {
        let result = self.server.run(shutdown).await;
        self.client.close().await;
        result
    }
}

/// Bring up every subsystem in dependency order.
pub async fn start(settings: &Settings) -> Result<Catcher, StartupError> {
    let body = ResponseBody::resolve(settings.maintenance_page.as_deref())?;
    let client = riemann::connect(&settings.monitoring).await?;
    start_with_client(settings, body, client).await
}

/// Finish startup with an already connected client.
pub async fn start_with_client(
    settings: &Settings,
    body: ResponseBody,
    client: Arc<dyn EventClient>,
) -> Result<Catcher, StartupError> {
    if let Some(addr) = settings.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let handler = Arc::new(RequestHandler::new(
        settings.event.clone(),
        body,
        Arc::clone(&client),
    ));

    let listener = Listener::bind(settings.listen_address, settings.max_connections).await?;
    let server = HttpServer::new(listener, handler, settings.shutdown_grace);

    tracing::info!(
        listen = %settings.listen_address,
        collector = %format!("{}:{}", settings.monitoring.host, settings.monitoring.port),
        transport = %settings.monitoring.transport,
        service = %settings.event.service,
        host = %settings.event.host,
        "Error catcher ready"
    );

    Ok(Catcher { server, client })
}
