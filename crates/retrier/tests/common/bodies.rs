//! Request body helpers

use std::io;

use bytes::Bytes;
use futures_util::stream;

use retrier::http::Body;

/// A body that yields `prefix` and then fails with `kind`
pub fn failing_body(prefix: &'static str, kind: io::ErrorKind) -> Body {
    let chunks = vec![
        Ok(Bytes::from_static(prefix.as_bytes())),
        Err(io::Error::new(kind, "body read failed")),
    ];
    Body::from_stream(stream::iter(chunks))
}

/// A streaming (unbuffered) body made of `chunks`
pub fn chunked_body(chunks: &[&'static str]) -> Body {
    let chunks: Vec<io::Result<Bytes>> = chunks
        .iter()
        .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
        .collect();
    Body::from_stream(stream::iter(chunks))
}
