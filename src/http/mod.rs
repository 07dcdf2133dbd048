//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → head.rs (raw head captured in arrival order, bytes replayed)
//!     → server.rs (hyper HTTP/1.1, tracing layer, reception callbacks)
//!     → request.rs (method, URL, headers as a borrowed view)
//!     → [catcher handler builds and sends the event]
//!     → response.rs (uniform reply from the process-wide body)
//!     → Send to client
//! ```

pub mod head;
pub mod request;
pub mod response;
pub mod server;

pub use head::{HeaderField, RequestHead};
pub use request::RequestContext;
pub use response::{ResponseBody, ResponseSlot};
pub use server::{dispatch, HttpServer};
