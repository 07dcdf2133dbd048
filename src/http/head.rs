//! Raw request head capture.
//!
//! # Responsibilities
//! - Read the request head off the socket before hyper sees it
//! - Keep every header field in arrival order with its name as sent
//! - Replay the consumed bytes so hyper parses the same request
//!
//! # Design Decisions
//! - hyper's `HeaderMap` lowercases names and groups repeated ones, so it
//!   cannot reproduce the order a client sent
//! - Parsing uses `httparse`, the same parser hyper runs on the replayed bytes
//! - A head that cannot be parsed closes the connection without a reply

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

/// Largest request head read before giving up.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

/// Most header fields accepted in one head.
pub const MAX_HEADERS: usize = 100;

#[derive(Debug, Error)]
pub enum HeadError {
    #[error("connection closed before the request head was complete")]
    Incomplete,

    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    #[error("malformed request head: {0}")]
    Malformed(#[from] httparse::Error),

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// One header line as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Header fields of one request, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    fields: Vec<HeaderField>,
}

impl RequestHead {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, value)| HeaderField {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    /// Parse a head from the start of `buf`.
    ///
    /// Returns `None` while the head is still incomplete, otherwise the head
    /// and the number of bytes it occupies. Values that are not valid UTF-8
    /// are converted lossily.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, HeadError> {
        let mut storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut storage);

        let len = match request.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(len) => len,
        };

        let fields = request
            .headers
            .iter()
            .map(|h| HeaderField {
                name: h.name.to_string(),
                value: String::from_utf8_lossy(h.value).into_owned(),
            })
            .collect();
        Ok(Some((Self { fields }, len)))
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Read until a complete head is buffered.
///
/// Returns the head together with every byte read so far, which the caller
/// replays to the HTTP parser.
pub async fn read_head<S>(stream: &mut S) -> Result<(RequestHead, Bytes), HeadError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(HeadError::Incomplete);
        }
        if let Some((head, _)) = RequestHead::parse(&buf)? {
            return Ok((head, buf.freeze()));
        }
        if buf.len() >= MAX_HEAD_LEN {
            return Err(HeadError::TooLarge(MAX_HEAD_LEN));
        }
    }
}

/// A stream that yields already consumed bytes before reading on.
#[derive(Debug)]
pub struct Replay<S> {
    consumed: Bytes,
    inner: S,
}

impl<S> Replay<S> {
    pub fn new(consumed: Bytes, inner: S) -> Self {
        Self { consumed, inner }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Replay<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.consumed.has_remaining() {
            let n = self.consumed.len().min(buf.remaining());
            buf.put_slice(&self.consumed[..n]);
            self.consumed.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Replay<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_and_values(head: &RequestHead) -> Vec<(&str, &str)> {
        head.fields()
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect()
    }

    #[test]
    fn keeps_arrival_order_and_case() {
        let raw = b"GET / HTTP/1.1\r\nX-A: 1\r\nX-B: 2\r\nx-a: 3\r\nConnection: close\r\n\r\n";
        let (head, len) = RequestHead::parse(raw).unwrap().unwrap();

        assert_eq!(len, raw.len());
        assert_eq!(
            names_and_values(&head),
            [("X-A", "1"), ("X-B", "2"), ("x-a", "3"), ("Connection", "close")]
        );
    }

    #[test]
    fn partial_head_needs_more_bytes() {
        assert!(RequestHead::parse(b"GET / HTTP/1.1\r\nHost: a\r\n").unwrap().is_none());
    }

    #[test]
    fn opaque_value_bytes_are_lossy() {
        let (head, _) = RequestHead::parse(b"GET / HTTP/1.1\r\nX-Raw: caf\xe9\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(head.fields()[0].value, "caf\u{fffd}");
    }

    #[test]
    fn garbage_is_malformed() {
        let err = RequestHead::parse(b"\x01\x02 nonsense\r\n\r\n").unwrap_err();
        assert!(matches!(err, HeadError::Malformed(_)));
    }

    #[tokio::test]
    async fn read_head_returns_everything_consumed() {
        let raw: &[u8] = b"POST /form HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let mut source = raw;

        let (head, consumed) = read_head(&mut source).await.unwrap();
        assert_eq!(names_and_values(&head), [("Content-Length", "5")]);
        assert_eq!(&consumed[..], raw);
    }

    #[tokio::test]
    async fn early_close_is_incomplete() {
        let mut source: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n";
        let err = read_head(&mut source).await.unwrap_err();
        assert!(matches!(err, HeadError::Incomplete));
    }

    #[tokio::test]
    async fn oversized_head_is_refused() {
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_LEN + 1));
        let mut source = raw.as_slice();

        let err = read_head(&mut source).await.unwrap_err();
        assert!(matches!(err, HeadError::TooLarge(MAX_HEAD_LEN)));
    }

    #[tokio::test]
    async fn replay_yields_consumed_bytes_first() {
        let rest: &[u8] = b" world";
        let mut replay = Replay::new(Bytes::from_static(b"hello"), rest);

        let mut out = String::new();
        replay.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }
}
