//! Response content and the per-request response slot.
//!
//! # Responsibilities
//! - Resolve the process-wide body once at startup (literal or maintenance page)
//! - Build the uniform `200 text/html` reply
//! - Hold at most one queued response per logical request
//!
//! # Design Decisions
//! - The body is `Bytes`, so every request shares the same allocation
//! - Responses never vary by method, path or headers

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use thiserror::Error;

/// Body served when no maintenance page is configured.
pub const DEFAULT_BODY: &str = "OK\n";

/// Content type of every reply.
pub const CONTENT_TYPE: &str = "text/html";

/// Failure to load the maintenance page at startup.
#[derive(Debug, Error)]
#[error("cannot read maintenance page '{}': {source}", path.display())]
pub struct BodyError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Immutable reply content shared by all connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    content: Bytes,
    content_type: &'static str,
}

impl ResponseBody {
    /// The short literal reply.
    pub fn literal() -> Self {
        Self {
            content: Bytes::from_static(DEFAULT_BODY.as_bytes()),
            content_type: CONTENT_TYPE,
        }
    }

    /// Read the whole maintenance page into memory.
    pub fn from_file(path: &Path) -> Result<Self, BodyError> {
        let content = fs::read(path).map_err(|source| BodyError {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            bytes = content.len(),
            "Maintenance page loaded"
        );

        Ok(Self {
            content: Bytes::from(content),
            content_type: CONTENT_TYPE,
        })
    }

    /// Resolve the body from an optional maintenance page path.
    pub fn resolve(maintenance_page: Option<&Path>) -> Result<Self, BodyError> {
        match maintenance_page {
            Some(path) => Self::from_file(path),
            None => Ok(Self::literal()),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Build the reply every request receives.
    pub fn to_response(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.content.clone()));
        *response.status_mut() = StatusCode::OK;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::literal()
    }
}

/// Returned when a second response is queued for the same request.
#[derive(Debug, Error)]
#[error("a response is already queued for this request")]
pub struct AlreadyQueued;

/// Connection-side slot receiving the reply for one logical request.
#[derive(Debug, Default)]
pub struct ResponseSlot {
    queued: Option<Response<Full<Bytes>>>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, response: Response<Full<Bytes>>) -> Result<(), AlreadyQueued> {
        if self.queued.is_some() {
            return Err(AlreadyQueued);
        }
        self.queued = Some(response);
        Ok(())
    }

    pub fn is_queued(&self) -> bool {
        self.queued.is_some()
    }

    pub fn take(&mut self) -> Option<Response<Full<Bytes>>> {
        self.queued.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::io::Write;

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn literal_reply() {
        let response = ResponseBody::resolve(None).unwrap().to_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(body_of(response).await, "OK\n");
    }

    #[tokio::test]
    async fn maintenance_page_reply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Down for maintenance").unwrap();

        let body = ResponseBody::resolve(Some(file.path())).unwrap();
        assert_eq!(body.content().len(), 20);

        let response = body.to_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(body_of(response).await, "Down for maintenance");
    }

    #[test]
    fn missing_page_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.html");
        let err = ResponseBody::resolve(Some(&path)).unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.to_string().contains("absent.html"));
    }

    #[test]
    fn slot_holds_one_response() {
        let body = ResponseBody::literal();
        let mut slot = ResponseSlot::new();
        assert!(!slot.is_queued());

        slot.queue(body.to_response()).unwrap();
        assert!(slot.is_queued());
        assert!(slot.queue(body.to_response()).is_err());

        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }
}
