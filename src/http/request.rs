//! Read-only view of an incoming request.
//!
//! # Responsibilities
//! - Expose the method, URL and header fields the handler turns into attributes
//! - Enumerate headers without copying them
//!
//! # Design Decisions
//! - The URL is the request path; the query string is not part of it
//! - Headers come from the captured [`RequestHead`], so repeated names keep
//!   their place and names keep the case the client used

use http::request::Parts;

use crate::http::head::{HeaderField, RequestHead};

/// Borrowed request data valid for one processing pass.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    method: &'a str,
    url: &'a str,
    headers: &'a [HeaderField],
}

impl<'a> RequestContext<'a> {
    pub fn new(method: &'a str, url: &'a str, headers: &'a [HeaderField]) -> Self {
        Self {
            method,
            url,
            headers,
        }
    }

    /// Combine hyper's request line with the captured header fields.
    pub fn from_parts(parts: &'a Parts, head: &'a RequestHead) -> Self {
        Self::new(parts.method.as_str(), parts.uri.path(), head.fields())
    }

    pub fn method(&self) -> &'a str {
        self.method
    }

    pub fn url(&self) -> &'a str {
        self.url
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Header fields in arrival order.
    pub fn headers(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.headers
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }
}
