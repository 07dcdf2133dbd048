//! Request-to-event translation subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, URL, headers)
//!     → handler.rs (two-phase protocol, once-only processing pass)
//!     → attributes.rs (ordered, failure-safe attribute list)
//!     → event.rs (MonitoringEvent handed to the EventClient)
//!     → ResponseSlot (uniform 200 reply)
//! ```

pub mod attributes;
pub mod event;
pub mod handler;

pub use attributes::{AttributeError, AttributeList, AttributeListBuilder, ReservePolicy};
pub use event::{EventClient, MonitoringEvent, SendError};
pub use handler::{Outcome, ProcessingState, RequestHandler};
