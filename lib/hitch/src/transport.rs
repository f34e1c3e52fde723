//! HTTP transport using hyper-util.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::LoggingLayer;
use crate::{
    Body, CancelToken, Error, RequestDraft, ResponseHandle, Result, Transport,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
pub type BoxedService = BoxCloneService<RequestDraft, ResponseHandle, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<ResponseHandle>> + Send + 'static>>;

/// Makes a `BoxedService` shareable behind `&self`.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, draft: RequestDraft) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(draft).await })
    }
}

// ============================================================================
// Raw Transport
// ============================================================================

/// How the response body is handed over.
enum Delivery {
    /// Collected before the handle is returned.
    Buffered,
    /// Handed over unread, ending early when the token fires.
    Streamed(Option<CancelToken>),
}

/// Pooled hyper client at the bottom of the service stack.
#[derive(Clone)]
struct RawHyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl RawHyperTransport {
    fn new(config: &ClientConfig) -> Result<Self> {
        let connector = https_connector(config.connect_timeout)?;

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Ok(Self {
            inner,
            timeout: config.timeout,
        })
    }

    /// Run one exchange, bounded by the earlier of the draft deadline and the client timeout,
    /// and abandoned as soon as the draft's cancel token fires.
    ///
    /// A streamed response is returned once its headers arrived; its body is handed over
    /// unread and ends early if the token fires.
    async fn execute(&self, draft: RequestDraft) -> Result<ResponseHandle> {
        let streamed = draft.streams_response();
        let (request, context) = draft.into_http()?;
        context.check()?;

        let timeout = context
            .remaining()
            .map_or(self.timeout, |remaining| remaining.min(self.timeout));
        let cancel = context.cancel_token().cloned();
        let delivery = if streamed {
            Delivery::Streamed(cancel.clone())
        } else {
            Delivery::Buffered
        };
        let exchange = tokio::time::timeout(timeout, self.exchange(request.map(Full::new), delivery));

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(Error::Cancelled),
                outcome = exchange => outcome,
            },
            None => exchange.await,
        };

        outcome.map_err(|_| Error::Timeout)?
    }

    async fn exchange(
        &self,
        request: http::Request<Full<Bytes>>,
        delivery: Delivery,
    ) -> Result<ResponseHandle> {
        let response = self
            .inner
            .request(request)
            .await
            .map_err(Self::map_hyper_error)?;

        let (parts, incoming) = response.into_parts();
        let body = match delivery {
            Delivery::Streamed(cancel) => {
                let chunks = TryStreamExt::map_err(incoming.into_data_stream(), std::io::Error::other);
                match cancel {
                    Some(token) => Body::from_stream(
                        chunks.take_until(async move { token.cancelled().await }),
                    ),
                    None => Body::from_stream(chunks),
                }
            }
            Delivery::Buffered => Body::from_bytes(
                incoming
                    .collect()
                    .await
                    .map_err(|e| Error::connection(e.to_string()))?
                    .to_bytes(),
            ),
        };

        Ok(ResponseHandle::new(parts.status, parts.headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = format!("{err:?}");

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<RequestDraft> for RawHyperTransport {
    type Response = ResponseHandle;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, draft: RequestDraft) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(draft).await })
    }
}

// ============================================================================
// Public Transport
// ============================================================================

/// [`Transport`] over hyper-util with connection pooling, rustls, and tower layers.
///
/// # Example
///
/// ```no_run
/// use hitch::HyperTransport;
/// use std::time::Duration;
///
/// # fn main() -> hitch::Result<()> {
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(5))
///     .with_logging()
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: SyncService,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] when the TLS configuration cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom configuration (no middleware).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] when the TLS configuration cannot be built.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let raw = RawHyperTransport::new(&config)?;
        Ok(Self::with_service(BoxCloneService::new(raw), config))
    }

    fn with_service(service: BoxedService, config: ClientConfig) -> Self {
        Self {
            service: SyncService::new(service),
            config,
        }
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for HyperTransport {
    fn execute(&self, draft: RequestDraft) -> impl Future<Output = Result<ResponseHandle>> + Send {
        self.service.call(draft)
    }
}

impl Service<RequestDraft> for HyperTransport {
    type Response = ResponseHandle;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, draft: RequestDraft) -> Self::Future {
        self.service.call(draft)
    }
}

/// Builder for [`HyperTransport`].
///
/// Layers wrap the raw hyper service; the first one added is the outermost.
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: ClientConfigBuilder,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Start from an existing configuration builder.
    #[must_use]
    pub fn config(mut self, config: ClientConfigBuilder) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Add a Tower layer around the transport.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<RequestDraft, Response = ResponseHandle, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<RequestDraft>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Add request/response logging at info level.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] when the TLS configuration cannot be built.
    pub fn build(self) -> Result<HyperTransport> {
        let config = self.config.build();
        let mut service: BoxedService = BoxCloneService::new(RawHyperTransport::new(&config)?);

        // Innermost first, so the first layer added ends up outermost
        for layer_fn in self.layers.into_iter().rev() {
            service = layer_fn(service);
        }

        Ok(HyperTransport::with_service(service, config))
    }
}
