//! Configured HTTP client over a [`Transport`].

use bytes::Bytes;
use http::header::{self, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;

use crate::{
    ClientConfig, EncodedValues, Error, HyperTransport, LineStream, RequestChain, RequestDraft,
    ResponseChain, ResponseHandle, Result, Step, Transport, req, resp,
};

/// HTTP client applying a [`ClientConfig`] to every request before handing it to `T`.
///
/// # Example
///
/// ```no_run
/// use hitch::{Client, RequestChain, ResponseChain, req, resp};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct User { id: u64, name: String }
///
/// # async fn run() -> hitch::Result<()> {
/// let client = Client::new()?;
/// let mut user = User::default();
/// client
///     .send(
///         RequestChain::new()
///             .with(req::get())
///             .with(req::base_url("https://api.example.com"))
///             .with(req::path("/users/42")),
///         ResponseChain::new()
///             .with(resp::allowed_status(resp::STATUS_2XX))
///             .with(resp::decode_json(&mut user)),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client<T = HyperTransport> {
    transport: T,
    config: ClientConfig,
}

impl Client<HyperTransport> {
    /// Client with default configuration over a [`HyperTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] when the TLS configuration cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Client over a [`HyperTransport`] sharing `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] when the TLS configuration cannot be built.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HyperTransport::with_config(config.clone())?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> Client<T> {
    /// Client over any transport.
    pub const fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Parse `url`, inserting a trailing `/` in the path when `append_slash` is set and merging
    /// the configured query values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the (slash-adjusted) URL does not parse.
    pub fn prepare_url(&self, url: &str) -> Result<Url> {
        let mut raw = url.to_string();
        if self.config.append_slash {
            match raw.find(['?', '&']) {
                Some(index) => {
                    let (head, _) = raw.split_at(index);
                    if !head.ends_with('/') {
                        raw.insert(index, '/');
                    }
                }
                None => {
                    if !raw.ends_with('/') {
                        raw.push('/');
                    }
                }
            }
        }

        let mut parsed = Url::parse(&raw)?;

        if !self.config.added_query.is_empty() {
            let mut query = EncodedValues::parse(parsed.query().unwrap_or_default());
            query.extend(self.config.added_query.clone());
            parsed.set_query(Some(&query.to_query_string()));
            if parsed.path().is_empty() {
                parsed.set_path("/");
            }
        }

        Ok(parsed)
    }

    /// Apply the configuration to `draft`: added headers, basic auth, then [`Self::prepare_url`].
    ///
    /// Added headers never replace the draft's own; basic auth is skipped when the draft
    /// already carries an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBaseUrl`] when the draft has no URL, or the errors of
    /// [`Self::prepare_url`].
    pub fn prepare(&self, draft: &mut RequestDraft) -> Result<()> {
        let headers = draft.headers_mut();
        for (name, value) in &self.config.added_headers {
            headers.append(name, value.clone());
        }

        if let Some((user, pass)) = self.config.credentials()
            && !headers.contains_key(header::AUTHORIZATION)
        {
            let value = HeaderValue::try_from(req::basic_auth_value(user, pass))
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let url = draft.url().ok_or(Error::MissingBaseUrl("send"))?;
        let prepared = self.prepare_url(url.as_str())?;
        draft.set_url(prepared);
        Ok(())
    }

    /// Prepare `draft` and execute it.
    ///
    /// # Errors
    ///
    /// Returns preparation errors or the transport's error.
    pub async fn execute(&self, mut draft: RequestDraft) -> Result<ResponseHandle> {
        let span = tracing::info_span!("exchange", method = %draft.method());
        async move {
            self.prepare(&mut draft)?;
            if self.config.debug
                && let Some(url) = draft.url()
            {
                tracing::debug!(method = %draft.method(), %url, "sending request");
            }
            self.transport.execute(draft).await
        }
        .instrument(span)
        .await
    }

    /// Run `request` over a fresh draft, execute it, then run `response` over the result.
    ///
    /// Errors of either chain report the 1-based position of the failing option.
    ///
    /// # Errors
    ///
    /// Returns the first failing option's error, or the transport's error.
    pub async fn send(
        &self,
        mut request: RequestChain<'_>,
        mut response: ResponseChain<'_>,
    ) -> Result<ResponseHandle> {
        let mut draft = RequestDraft::new();
        request.apply(&mut draft)?;
        let mut handle = self.execute(draft).await?;
        response.apply(&mut handle)?;
        Ok(handle)
    }

    /// `GET url`.
    ///
    /// # Errors
    ///
    /// Returns URL, preparation or transport errors.
    pub async fn get(&self, url: &str) -> Result<ResponseHandle> {
        self.simple(req::get(), url, None).await
    }

    /// `DELETE url`.
    ///
    /// # Errors
    ///
    /// Returns URL, preparation or transport errors.
    pub async fn delete(&self, url: &str) -> Result<ResponseHandle> {
        self.simple(req::delete(), url, None).await
    }

    /// `POST url` with a raw body.
    ///
    /// # Errors
    ///
    /// Returns URL, preparation or transport errors.
    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<ResponseHandle> {
        self.simple(req::post(), url, Some(body.into())).await
    }

    /// `PUT url` with a raw body.
    ///
    /// # Errors
    ///
    /// Returns URL, preparation or transport errors.
    pub async fn put(&self, url: &str, body: impl Into<Bytes>) -> Result<ResponseHandle> {
        self.simple(req::put(), url, Some(body.into())).await
    }

    async fn simple(
        &self,
        mut method: impl Step<RequestDraft>,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<ResponseHandle> {
        let mut draft = RequestDraft::new();
        method.apply(&mut draft)?;
        draft.set_url(Url::parse(url)?);
        if let Some(body) = body {
            draft.set_body(body);
        }
        self.execute(draft).await
    }

    /// Execute `draft` and decode the JSON response body, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns transport errors or [`Error::JsonDeserialization`].
    pub async fn execute_json<R: DeserializeOwned + Send>(&self, draft: RequestDraft) -> Result<R> {
        let mut handle = self.execute(draft).await?;
        let mut decoded: Option<R> = None;
        resp::decode_json(&mut decoded).apply(&mut handle)?;
        decoded.ok_or_else(|| Error::json_deserialization("", "null body"))
    }

    /// `GET url`, decoding the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns transport errors or [`Error::JsonDeserialization`].
    pub async fn get_json<R: DeserializeOwned + Send>(&self, url: &str) -> Result<R> {
        let mut draft = RequestDraft::new();
        draft.set_url(Url::parse(url)?);
        self.execute_json(draft).await
    }

    /// `POST url` with `body` as JSON, decoding the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns serialization, transport or deserialization errors.
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let mut draft = RequestDraft::new();
        RequestChain::new()
            .with(req::post())
            .with(req::base_url(url))
            .with(req::json(body))
            .apply(&mut draft)?;
        self.execute_json(draft).await
    }

    /// `GET url` with `Accept: text/event-stream`, returning the body as trimmed,
    /// non-empty lines.
    ///
    /// Returns once the response headers arrived; lines are produced as the server sends
    /// them. The client timeout bounds only the wait for the headers.
    ///
    /// # Errors
    ///
    /// Returns URL, preparation or transport errors.
    pub async fn get_lines(&self, url: &str) -> Result<LineStream> {
        let mut draft = RequestDraft::new();
        draft.set_url(Url::parse(url)?);
        draft
            .headers_mut()
            .append(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        draft.set_streamed_response(true);
        let handle = self.execute(draft).await?;
        Ok(handle.into_lines())
    }
}

/// Build a factory of fresh drafts, each produced by running the chain `options` returns.
///
/// ```
/// use hitch::{RequestChain, req, request_factory};
///
/// let factory = request_factory(|| {
///     RequestChain::new()
///         .with(req::base_url("https://api.example.com"))
///         .with(req::user_agent("hitch"))
/// });
/// let draft = factory().unwrap();
/// assert_eq!(draft.header("user-agent"), Some("hitch"));
/// ```
pub fn request_factory<F>(options: F) -> impl Fn() -> Result<RequestDraft>
where
    F: Fn() -> RequestChain<'static>,
{
    move || {
        let mut draft = RequestDraft::new();
        options().apply(&mut draft)?;
        Ok(draft)
    }
}
