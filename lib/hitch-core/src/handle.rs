//! Received response under inspection.
//!
//! A [`ResponseHandle`] carries the status, headers and an unconsumed [`Body`]. Response
//! options (see [`crate::resp`]) validate it and consume the body.
//!
//! A body is either readable in place (in-memory bytes or any [`Read`]er) or a stream of
//! chunks still arriving from the connection. Streamed bodies are consumed asynchronously,
//! through [`LineStream`] or after [`Body::buffer`].

use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use http::{HeaderMap, StatusCode, header};

use crate::Result;

/// Chunks of a body still arriving from the connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Size of each synchronous read when a reader-backed body is polled.
const CHUNK_SIZE: usize = 8 * 1024;

enum Source {
    Reader(Box<dyn Read + Send>),
    Stream(ByteStream),
}

/// Response body: a byte stream that can be closed once, teed or drained.
///
/// Reading a closed body yields end-of-stream.
pub struct Body {
    source: Option<Source>,
}

impl Body {
    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// A body over in-memory bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_reader(Cursor::new(bytes.into()))
    }

    /// A body over any reader.
    #[must_use]
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            source: Some(Source::Reader(Box::new(reader))),
        }
    }

    /// A body whose chunks arrive asynchronously.
    ///
    /// Synchronous reads fail until [`buffer`](Self::buffer) has collected it.
    #[must_use]
    pub fn from_stream(stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            source: Some(Source::Stream(Box::pin(stream))),
        }
    }

    /// Whether the body was closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Whether chunks are still to be received asynchronously.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self.source, Some(Source::Stream(_)))
    }

    /// Release the underlying reader or stream.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&mut self) -> bool {
        self.source.take().is_some()
    }

    /// Receive a streamed body completely, making it readable in place. No-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error of the stream; the body is closed in that case.
    pub async fn buffer(&mut self) -> Result<()> {
        let Some(Source::Stream(stream)) = self.source.as_mut() else {
            return Ok(());
        };

        let mut buffered = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => buffered.extend_from_slice(&chunk),
                Err(err) => {
                    self.close();
                    return Err(err.into());
                }
            }
        }

        self.source = Some(Source::Reader(Box::new(Cursor::new(buffered.freeze()))));
        Ok(())
    }

    /// Copy the whole body into `sink`, leaving an identical body readable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from reading the body or writing the sink.
    pub fn tee(&mut self, sink: &mut (dyn Write + Send)) -> Result<()> {
        let mut buffered = Vec::new();
        self.read_to_end(&mut buffered)?;
        sink.write_all(&buffered)?;
        sink.flush()?;
        if !self.is_closed() {
            self.source = Some(Source::Reader(Box::new(Cursor::new(buffered))));
        }
        Ok(())
    }

    /// Read and discard everything, then close. Returns the number of bytes discarded.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from reading the body; the body is closed anyway.
    pub fn drain(&mut self) -> Result<u64> {
        let drained = io::copy(self, &mut io::sink());
        self.close();
        Ok(drained?)
    }

    /// Read everything into bytes, then close.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from reading the body; the body is closed anyway.
    pub fn to_bytes(&mut self) -> Result<Bytes> {
        let mut buffered = Vec::new();
        let read = self.read_to_end(&mut buffered);
        self.close();
        read?;
        Ok(Bytes::from(buffered))
    }

    /// Next chunk, whichever the source. Readers are read in place.
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        match self.source.as_mut() {
            None => Poll::Ready(None),
            Some(Source::Stream(stream)) => stream.as_mut().poll_next(cx),
            Some(Source::Reader(reader)) => {
                let mut chunk = vec![0; CHUNK_SIZE];
                Poll::Ready(match reader.read(&mut chunk) {
                    Ok(0) => None,
                    Ok(read) => {
                        chunk.truncate(read);
                        Some(Ok(Bytes::from(chunk)))
                    }
                    Err(err) => Some(Err(err)),
                })
            }
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.source.as_mut() {
            Some(Source::Reader(reader)) => reader.read(buf),
            Some(Source::Stream(_)) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "streamed body must be buffered before it is read",
            )),
            None => Ok(0),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("closed", &self.is_closed())
            .field("streaming", &self.is_streaming())
            .finish_non_exhaustive()
    }
}

/// Status, headers and body of a received response.
#[derive(Debug)]
pub struct ResponseHandle {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ResponseHandle {
    /// Creates a new handle.
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Status line, e.g. `404 Not Found`.
    #[must_use]
    pub fn phrase(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {reason}", self.status.as_u16()),
            None => self.status.as_u16().to_string(),
        }
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Advertised `Content-Length`; `None` when missing or malformed.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable access to the body.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Hand the body over to a line reader.
    #[must_use]
    pub fn into_lines(self) -> LineStream {
        LineStream::new(self.body)
    }
}

/// Incremental reader yielding trimmed, non-empty lines, e.g. of an event stream.
///
/// Each line is produced as soon as its terminating newline arrives; a final unterminated
/// line is produced at end of stream. The body is closed on end of stream or on error.
///
/// ```
/// use hitch_core::{Body, LineStream};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> hitch_core::Result<()> {
/// let mut lines = LineStream::new(Body::from_bytes("data: one\n\ndata: two\n"));
/// assert_eq!(lines.next_line().await.transpose()?, Some("data: one".to_string()));
/// assert_eq!(lines.next_line().await.transpose()?, Some("data: two".to_string()));
/// assert!(lines.next_line().await.is_none());
/// # Ok(())
/// # }
/// ```
pub struct LineStream {
    body: Body,
    pending: BytesMut,
}

impl LineStream {
    /// Creates a line reader over `body`.
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self {
            body,
            pending: BytesMut::new(),
        }
    }

    /// Next line; `None` once the body is exhausted or closed.
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        self.next().await
    }

    /// Stop reading and close the body.
    pub fn close(&mut self) {
        self.body.close();
        self.pending.clear();
    }

    /// First complete, non-blank line already received.
    fn buffered_line(&mut self) -> Option<Result<String>> {
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line = self.pending.split_to(newline + 1);
            if let Some(line) = Self::decode(&line) {
                return Some(line);
            }
        }
        None
    }

    /// Trimmed text of a raw line, `None` when blank.
    fn decode(raw: &[u8]) -> Option<Result<String>> {
        match std::str::from_utf8(raw) {
            Ok(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| Ok(trimmed.to_string()))
            }
            Err(err) => Some(Err(io::Error::new(io::ErrorKind::InvalidData, err).into())),
        }
    }
}

impl Stream for LineStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.buffered_line() {
                if line.is_err() {
                    this.close();
                }
                return Poll::Ready(Some(line));
            }

            match ready!(this.body.poll_chunk(cx)) {
                Some(Ok(chunk)) => this.pending.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    this.close();
                    return Poll::Ready(Some(Err(err.into())));
                }
                None => {
                    this.body.close();
                    let rest = this.pending.split();
                    return Poll::Ready(Self::decode(&rest));
                }
            }
        }
    }
}

impl fmt::Debug for LineStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream")
            .field("body", &self.body)
            .field("pending", &self.pending.len())
            .finish()
    }
}
