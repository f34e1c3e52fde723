//! Client configuration types.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use hitch_core::EncodedValues;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout duration; a shorter [`Context`](crate::Context) deadline wins.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Headers added to every request, on top of the ones it already carries.
    pub added_headers: HeaderMap,
    /// Query values added to every request URL.
    pub added_query: EncodedValues,
    /// Insert a `/` at the end of the path when missing.
    pub append_slash: bool,
    /// Basic-auth credentials; only used when both are non-empty.
    pub basic_auth: Option<(String, String)>,
    /// Log method and URL of every request.
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            added_headers: HeaderMap::new(),
            added_query: EncodedValues::new(),
            append_slash: false,
            basic_auth: None,
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Basic-auth credentials when both user and password are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match &self.basic_auth {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    added_headers: HeaderMap,
    added_query: EncodedValues,
    append_slash: bool,
    basic_auth: Option<(String, String)>,
    debug: bool,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Add a header to every request. Repeated names accumulate.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.added_headers.append(name, value);
        self
    }

    /// Add a query value to every request URL. Repeated keys accumulate.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.added_query.add(key, value);
        self
    }

    /// Insert a trailing `/` in every request path.
    #[must_use]
    pub const fn append_slash(mut self, append_slash: bool) -> Self {
        self.append_slash = append_slash;
        self
    }

    /// Send basic-auth credentials with every request.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Log method and URL of every request.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            added_headers: self.added_headers,
            added_query: self.added_query,
            append_slash: self.append_slash,
            basic_auth: self.basic_auth,
            debug: self.debug,
        }
    }
}
