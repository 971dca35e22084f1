//! Request and response types exchanged with transports
//!
//! A transport needs the method, URL, headers and a body it can stream. The
//! retry layer replays the body and inspects the method and status code.

use std::borrow::Cow;
use std::fmt;
use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

/// An HTTP method, normalized to upper case
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Method(Cow<'static, str>);

impl Method {
    pub const GET: Method = Method(Cow::Borrowed("GET"));
    pub const HEAD: Method = Method(Cow::Borrowed("HEAD"));
    pub const POST: Method = Method(Cow::Borrowed("POST"));
    pub const PUT: Method = Method(Cow::Borrowed("PUT"));
    pub const PATCH: Method = Method(Cow::Borrowed("PATCH"));
    pub const DELETE: Method = Method(Cow::Borrowed("DELETE"));
    pub const OPTIONS: Method = Method(Cow::Borrowed("OPTIONS"));

    /// Create a method from any string; `"get"` and `"GET"` are equal
    pub fn new(method: impl AsRef<str>) -> Self {
        Self(Cow::Owned(method.as_ref().trim().to_ascii_uppercase()))
    }

    /// The upper-cased method name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        Self::new(method)
    }
}

impl From<String> for Method {
    fn from(method: String) -> Self {
        Self::new(method)
    }
}

/// A request or response body
///
/// A body is either fully materialized bytes or a stream of chunks that can
/// be read exactly once.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    /// An empty, fully buffered body
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Wrap a stream of chunks; a chunk error fails whoever reads the body
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream(stream.boxed()),
        }
    }

    /// The bytes of a fully buffered body, `None` for a stream
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.kind {
            Kind::Full(bytes) => Some(bytes),
            Kind::Stream(_) => None,
        }
    }

    /// Take the bytes of a fully buffered body, handing a stream back as-is
    pub fn try_into_bytes(self) -> Result<Bytes, Self> {
        match self.kind {
            Kind::Full(bytes) => Ok(bytes),
            kind @ Kind::Stream(_) => Err(Self { kind }),
        }
    }

    /// Whether the body is held in memory and can be cloned cheaply
    pub fn is_buffered(&self) -> bool {
        matches!(self.kind, Kind::Full(_))
    }

    /// Read the whole body into memory
    pub async fn collect(self) -> io::Result<Bytes> {
        match self.kind {
            Kind::Full(bytes) => Ok(bytes),
            Kind::Stream(stream) => {
                let buf = stream
                    .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                        buf.extend_from_slice(&chunk);
                        Ok(buf)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }

    /// Read and discard the rest of the body, returning the number of bytes
    /// consumed. Stops quietly at the first read error.
    pub async fn drain(self) -> u64 {
        match self.kind {
            Kind::Full(bytes) => bytes.len() as u64,
            Kind::Stream(mut stream) => {
                let mut drained = 0u64;
                while let Some(Ok(chunk)) = stream.next().await {
                    drained += chunk.len() as u64;
                }
                drained
            }
        }
    }

    /// Convert into a chunk stream
    pub fn into_stream(self) -> BoxStream<'static, io::Result<Bytes>> {
        match self.kind {
            Kind::Full(bytes) if bytes.is_empty() => stream::empty().boxed(),
            Kind::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Kind::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Full(bytes) => f.debug_tuple("Body").field(&bytes.len()).finish(),
            Kind::Stream(_) => f.write_str("Body(<stream>)"),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}

/// Everything about a request except its body
///
/// The head stays fixed for the whole retry sequence. Its cancellation token
/// is shared by every attempt made for the request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    cancellation: CancellationToken,
}

impl RequestHead {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Token that aborts in-flight attempts and pending retries when cancelled
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// An outbound request
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    body: Option<Body>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            head: RequestHead::new(method, url),
            body: None,
        }
    }

    pub fn from_parts(head: RequestHead, body: Option<Body>) -> Self {
        Self { head, body }
    }

    pub fn into_parts(self) -> (RequestHead, Option<Body>) {
        (self.head, self.body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace the request's cancellation token, e.g. with a child of a
    /// token owned by the caller
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.head.cancellation = token;
        self
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn url(&self) -> &str {
        &self.head.url
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

/// A response produced by one attempt
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_normalized_to_upper_case() {
        assert_eq!(Method::new("get"), Method::GET);
        assert_eq!(Method::from(" Post "), Method::POST);
        assert_eq!(Method::new("purge").as_str(), "PURGE");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = Request::new(Method::GET, "http://example.com")
            .with_header("Content-Type", "text/plain");

        assert_eq!(request.head().header("content-type"), Some("text/plain"));
        assert_eq!(request.head().header("accept"), None);
    }

    #[tokio::test]
    async fn test_collect_stream_body() {
        let chunks = vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ];
        let body = Body::from_stream(stream::iter(chunks));

        assert!(!body.is_buffered());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_collect_propagates_read_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"hel")),
            Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
        ];
        let err = Body::from_stream(stream::iter(chunks))
            .collect()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_drain_counts_bytes_and_stops_on_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::other("reset")),
            Ok(Bytes::from_static(b"never read")),
        ];

        assert_eq!(Body::from_stream(stream::iter(chunks)).drain().await, 3);
        assert_eq!(Body::from("hello").drain().await, 5);
    }

    #[test]
    fn test_cancellation_shared_by_clones() {
        let request = Request::new(Method::GET, "http://example.com");
        let head = request.head().clone();

        request.head().cancellation_token().cancel();
        assert!(head.is_cancelled());
    }
}
