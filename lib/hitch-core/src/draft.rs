//! Outgoing request under construction.
//!
//! A [`RequestDraft`] starts empty and is filled in by request options (see [`crate::req`]).
//! Once a chain has run, a [`Transport`](crate::Transport) turns it into a real request with
//! [`RequestDraft::into_http`].

use bytes::Bytes;
use http::HeaderMap;
use url::Url;

use crate::{Context, EncodedValues, Error, Method, Result};

/// Mutable carrier of method, URL, headers, body and context.
#[derive(Debug, Clone, Default)]
pub struct RequestDraft {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Option<Bytes>,
    context: Context,
    streamed: bool,
}

impl RequestDraft {
    /// An empty `GET` draft with no URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Replace the method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Request URL, once a base URL was set.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Mutable URL, once a base URL was set.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.url.as_mut()
    }

    /// Replace the URL wholesale.
    pub fn set_url(&mut self, url: Url) {
        self.url = Some(url);
    }

    /// Mutable URL, failing with [`Error::MissingBaseUrl`] naming `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBaseUrl`] when no URL was set yet.
    pub fn require_url(&mut self, operation: &'static str) -> Result<&mut Url> {
        self.url.as_mut().ok_or(Error::MissingBaseUrl(operation))
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Install a body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    /// Cancellation and deadline.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Replace the context.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Whether the response body should be handed over while it is still arriving.
    #[must_use]
    pub const fn streams_response(&self) -> bool {
        self.streamed
    }

    /// Ask the transport for a streamed response body instead of a buffered one.
    ///
    /// The deadline then bounds the exchange up to the response headers only; cancelling the
    /// context ends the stream.
    pub fn set_streamed_response(&mut self, streamed: bool) {
        self.streamed = streamed;
    }

    /// The current query, parsed; empty without a URL or query.
    #[must_use]
    pub fn query_values(&self) -> EncodedValues {
        self.url
            .as_ref()
            .and_then(Url::query)
            .map(EncodedValues::parse)
            .unwrap_or_default()
    }

    /// Merge `values` into the existing query: parse it, append, re-encode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBaseUrl`] naming `operation` when no URL was set yet.
    pub fn merge_query(&mut self, operation: &'static str, values: EncodedValues) -> Result<()> {
        let mut merged = self.query_values();
        let url = self.require_url(operation)?;
        merged.extend(values);
        if merged.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&merged.to_query_string()));
        }
        Ok(())
    }

    /// Convert into an [`http::Request`], keeping the context aside.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBaseUrl`] without a URL, or [`Error::InvalidRequest`] when the
    /// URL is not a valid request target.
    pub fn into_http(self) -> Result<(http::Request<Bytes>, Context)> {
        let url = self.url.ok_or(Error::MissingBaseUrl("send"))?;

        let mut request = http::Request::builder()
            .method(http::Method::from(self.method))
            .uri(url.as_str())
            .body(self.body.unwrap_or_default())
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *request.headers_mut() = self.headers;

        Ok((request, self.context))
    }
}
