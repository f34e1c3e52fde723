//! Exchange logging middleware.
//!
//! Every draft passing through is summarized before it is sent: method, URL, time left before
//! its deadline, whether it can be cancelled and whether its body is streamed. The outcome is
//! logged with the status (or error) and elapsed milliseconds, inside the same span.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::{Error, RequestDraft, ResponseHandle, Result};

/// Layer that logs each exchange.
///
/// # Example
///
/// ```no_run
/// use hitch::HyperTransport;
/// use hitch::middleware::LoggingLayer;
///
/// # fn main() -> hitch::Result<()> {
/// let transport = HyperTransport::builder()
///     .layer(LoggingLayer::new())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Verbosity of the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug events, request headers included.
    Debug,
    /// Info events, summary only.
    #[default]
    Info,
}

impl LoggingLayer {
    /// Logs summaries at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs at debug level, headers included.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Level this layer logs at.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// What gets logged about a draft before it leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DraftSummary {
    method: String,
    url: String,
    deadline_ms: Option<u64>,
    cancellable: bool,
    streamed: bool,
}

impl DraftSummary {
    fn of(draft: &RequestDraft) -> Self {
        let context = draft.context();
        Self {
            method: draft.method().to_string(),
            url: draft.url().map(ToString::to_string).unwrap_or_default(),
            deadline_ms: context
                .remaining()
                .map(|left| u64::try_from(left.as_millis()).unwrap_or(u64::MAX)),
            cancellable: context.cancel_token().is_some(),
            streamed: draft.streams_response(),
        }
    }

    fn span(&self) -> Span {
        info_span!(
            "http_exchange",
            method = %self.method,
            url = %self.url,
            deadline_ms = self.deadline_ms,
            cancellable = self.cancellable,
        )
    }
}

fn log_outcome(result: &Result<ResponseHandle>, started: Instant) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(response) if response.is_success() => {
            info!(status = response.status().as_u16(), elapsed_ms, "exchange completed");
        }
        Ok(response) => {
            warn!(status = response.status().as_u16(), elapsed_ms, "exchange answered with an error status");
        }
        Err(Error::Cancelled) => info!(elapsed_ms, "exchange cancelled"),
        Err(Error::Timeout) => warn!(elapsed_ms, "exchange deadline exceeded"),
        Err(err) => warn!(error = %err, elapsed_ms, "exchange failed"),
    }
}

/// Service logging each exchange of the service it wraps.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Logging<S> {
    /// Wraps `inner`, logging at info level.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            level: LogLevel::Info,
        }
    }
}

impl<S> Service<RequestDraft> for Logging<S>
where
    S: Service<RequestDraft, Response = ResponseHandle, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = ResponseHandle;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, draft: RequestDraft) -> Self::Future {
        let summary = DraftSummary::of(&draft);
        let span = summary.span();

        span.in_scope(|| match self.level {
            LogLevel::Debug => debug!(
                streamed = summary.streamed,
                headers = ?draft.headers(),
                "sending draft"
            ),
            LogLevel::Info => info!(streamed = summary.streamed, "sending draft"),
        });

        // Clone-and-swap keeps the instance that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(draft).await;
                log_outcome(&result, started);
                result
            }
            .instrument(span),
        )
    }
}
