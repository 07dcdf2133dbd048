//! Per-request processing: attributes, event, reply.
//!
//! # Responsibilities
//! - Implement the two-phase reception protocol of the HTTP layer
//! - Run the processing pass exactly once per logical request
//! - Deliver the monitoring event on a best-effort basis
//! - Queue the uniform reply regardless of delivery outcome
//!
//! # Design Decisions
//! - The HTTP layer owns the per-request [`ProcessingState`] and passes it in
//! - `Completed` is set before the pass starts, so re-entry can never emit twice
//! - Allocation failure aborts the request without an event or a reply
//! - Delivery failure is logged and counted, never surfaced to the client

use std::sync::Arc;

use crate::catcher::attributes::{
    default_policy, AttributeError, AttributeList, AttributeListBuilder, ReservePolicy,
};
use crate::catcher::event::{EventClient, MonitoringEvent};
use crate::config::EventFields;
use crate::http::request::RequestContext;
use crate::http::response::{ResponseBody, ResponseSlot};
use crate::observability::metrics;

/// Progress of one logical request across handler invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    /// The handler has not seen this request yet.
    #[default]
    NotStarted,
    /// Headers were seen; waiting for the upload to drain.
    AwaitingCompletion,
    /// The processing pass has run.
    Completed,
}

/// Result of a single handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Call again once more of the request has arrived.
    Continue,
    /// The pass ran (now or earlier) and a reply is queued.
    Completed,
    /// The request must be dropped without a reply.
    Failed(AttributeError),
}

/// Turns caught requests into monitoring events and uniform replies.
pub struct RequestHandler {
    fields: EventFields,
    body: ResponseBody,
    client: Arc<dyn EventClient>,
    reserve: Arc<dyn ReservePolicy>,
}

impl RequestHandler {
    pub fn new(fields: EventFields, body: ResponseBody, client: Arc<dyn EventClient>) -> Self {
        Self {
            fields,
            body,
            client,
            reserve: default_policy(),
        }
    }

    /// Replace the policy used to grow attribute lists.
    pub fn with_reserve_policy(mut self, reserve: Arc<dyn ReservePolicy>) -> Self {
        self.reserve = reserve;
        self
    }

    pub fn fields(&self) -> &EventFields {
        &self.fields
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Handle one reception callback for a request.
    ///
    /// `upload_data_size` is the number of body bytes delivered with this
    /// call; it is reset to zero whenever the call only acknowledges input.
    pub async fn handle(
        &self,
        request: &RequestContext<'_>,
        connection: &mut ResponseSlot,
        state: &mut ProcessingState,
        upload_data_size: &mut usize,
    ) -> Outcome {
        match *state {
            ProcessingState::Completed => return Outcome::Completed,
            ProcessingState::AwaitingCompletion if *upload_data_size == 0 => {}
            _ => {
                *state = ProcessingState::AwaitingCompletion;
                *upload_data_size = 0;
                return Outcome::Continue;
            }
        }

        *state = ProcessingState::Completed;
        self.process(request, connection).await
    }

    async fn process(&self, request: &RequestContext<'_>, connection: &mut ResponseSlot) -> Outcome {
        metrics::record_request();

        let attributes = match self.collect_attributes(request) {
            Ok(attributes) => attributes,
            Err(e) => {
                tracing::warn!(
                    url = %request.url(),
                    error = %e,
                    "Dropping request, attribute list could not be built"
                );
                metrics::record_aborted();
                return Outcome::Failed(e);
            }
        };

        let event = MonitoringEvent {
            host: &self.fields.host,
            service: &self.fields.service,
            attributes,
        };

        let transport = self.client.transport();
        match self.client.send(&event).await {
            Ok(()) => {
                metrics::record_event_sent(transport);
                tracing::info!(url = %request.url(), "Notified collector");
            }
            Err(e) => {
                metrics::record_event_failed(transport);
                tracing::warn!(
                    url = %request.url(),
                    transport = %transport,
                    error = %e,
                    "Cannot send event"
                );
            }
        }
        drop(event);

        if let Err(e) = connection.queue(self.body.to_response()) {
            tracing::warn!(url = %request.url(), error = %e, "Reply not queued");
        }
        Outcome::Completed
    }

    fn collect_attributes<'a>(
        &self,
        request: &RequestContext<'a>,
    ) -> Result<AttributeList<'a>, AttributeError> {
        let mut builder =
            AttributeListBuilder::for_request(self.reserve.as_ref(), request.method(), request.url())?;
        builder.extend(request.headers())?;

        tracing::debug!(
            url = %request.url(),
            attributes = builder.len(),
            "Attribute list built"
        );
        builder.materialize()
    }
}
