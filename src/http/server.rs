//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Accept connections and serve each on its own task (HTTP/1.1)
//! - Capture the raw request head, then hand the connection to hyper
//! - Wrap the per-connection service in a tracing layer
//! - Drive the handler through its reception callbacks for every request
//! - Stop accepting on shutdown and let in-flight connections finish
//!
//! # Design Decisions
//! - One request per connection: the captured head belongs to exactly one
//!   request, so keep-alive is off and hyper closes after replying
//! - A `Failed` outcome becomes a service error, so hyper closes the
//!   connection without writing a reply
//! - Body bytes are consumed and discarded; only their arrival matters

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use http::{Request, Response};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::catcher::handler::{Outcome, ProcessingState, RequestHandler};
use crate::error::CatcherError;
use crate::http::head::{self, Replay, RequestHead};
use crate::http::request::RequestContext;
use crate::http::response::ResponseSlot;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};

/// HTTP front end of the error catcher.
pub struct HttpServer {
    listener: Listener,
    handler: Arc<RequestHandler>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl HttpServer {
    pub fn new(listener: Listener, handler: Arc<RequestHandler>, shutdown_grace: Duration) -> Self {
        Self {
            listener,
            handler,
            tracker: ConnectionTracker::new(),
            shutdown_grace,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<(), ListenerError> {
        let addr = self.listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "HTTP server starting");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(stream, peer, permit, shutdown.clone());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        drop(self.listener);
        if self.tracker.wait_for_drain(self.shutdown_grace).await {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                grace = ?self.shutdown_grace,
                "Connections still open after grace period"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        mut shutdown: ShutdownSignal,
    ) {
        let guard = self.tracker.track();
        let handler = Arc::clone(&self.handler);
        let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);

        tokio::spawn(
            async move {
                let _permit = permit;
                let _guard = guard;

                let (head, consumed) = tokio::select! {
                    read = head::read_head(&mut stream) => match read {
                        Ok(read) => read,
                        Err(e) => {
                            tracing::debug!(error = %e, "Closing without a usable request head");
                            return;
                        }
                    },
                    _ = shutdown.recv() => return,
                };
                let head = Arc::new(head);

                let service = ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .service_fn(move |request: Request<Incoming>| {
                        let handler = Arc::clone(&handler);
                        let head = Arc::clone(&head);
                        async move { dispatch(&handler, &head, request).await }
                    });

                let io = TokioIo::new(Replay::new(consumed, stream));
                let conn = http1::Builder::new()
                    .keep_alive(false)
                    .serve_connection(io, TowerToHyperService::new(service));
                tokio::pin!(conn);

                let mut draining = false;
                loop {
                    tokio::select! {
                        result = conn.as_mut() => {
                            if let Err(e) = result {
                                tracing::debug!(error = %e, "Connection ended with error");
                            }
                            break;
                        }
                        _ = shutdown.recv(), if !draining => {
                            draining = true;
                            conn.as_mut().graceful_shutdown();
                        }
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Run one request through the handler's reception protocol.
///
/// The handler is called once with the head of the request, once per
/// non-empty body chunk, and once more when the upload is complete. Any
/// call may settle the request; later input is then ignored.
pub async fn dispatch<B>(
    handler: &RequestHandler,
    head: &RequestHead,
    request: Request<B>,
) -> Result<Response<Full<Bytes>>, CatcherError>
where
    B: Body + Unpin,
    B::Error: std::fmt::Display,
{
    let (parts, mut body) = request.into_parts();
    let context = RequestContext::from_parts(&parts, head);
    let mut slot = ResponseSlot::new();
    let mut state = ProcessingState::NotStarted;

    let hint = body.size_hint();
    let mut upload = usize::try_from(hint.upper().unwrap_or(u64::MAX)).unwrap_or(usize::MAX);
    let outcome = handler.handle(&context, &mut slot, &mut state, &mut upload).await;
    if let Some(settled) = settle(outcome, &mut slot) {
        return settled;
    }

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| CatcherError::Body(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            let mut upload = data.remaining();
            if upload == 0 {
                continue;
            }
            let outcome = handler.handle(&context, &mut slot, &mut state, &mut upload).await;
            if let Some(settled) = settle(outcome, &mut slot) {
                return settled;
            }
        }
    }

    let mut upload = 0;
    let outcome = handler.handle(&context, &mut slot, &mut state, &mut upload).await;
    settle(outcome, &mut slot).unwrap_or(Err(CatcherError::NoResponse))
}

/// Map a handler outcome to the service result, or `None` to keep reading.
fn settle(
    outcome: Outcome,
    slot: &mut ResponseSlot,
) -> Option<Result<Response<Full<Bytes>>, CatcherError>> {
    match outcome {
        Outcome::Continue => None,
        Outcome::Completed => Some(slot.take().ok_or(CatcherError::NoResponse)),
        Outcome::Failed(e) => Some(Err(e.into())),
    }
}
