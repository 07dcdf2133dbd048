//! HTTP error catcher library.
//!
//! Every request received is reported to a Riemann collector as one event
//! and answered with the same `200 text/html` reply.

pub mod catcher;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod riemann;

pub use catcher::RequestHandler;
pub use config::Settings;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
