//! Error types for hitch.
//!
//! A single [`Error`] covers every family the toolkit can surface:
//!
//! - input shape: [`Error::NotAStruct`], [`Error::BadTagSyntax`]
//! - conversion: [`Error::NotConvertible`], located by [`Error::Field`] / [`Error::Embedded`]
//! - pipeline: [`Error::Step`], carrying the 1-based position of the failing option
//! - protocol: [`Error::StatusCode`], [`Error::MaxContentLength`]
//! - transport: [`Error::Connection`], [`Error::Tls`], [`Error::Timeout`], [`Error::Cancelled`]

use derive_more::{Display, Error, From};

/// Main error type for hitch operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    // ------------------------------------------------------------------------
    // Input shape
    // ------------------------------------------------------------------------
    /// The value handed to the query encoder is not a struct.
    #[display("provided input was not a struct (got {type_name})")]
    #[from(skip)]
    NotAStruct {
        /// Name of the offending type.
        #[error(not(source))]
        type_name: &'static str,
    },

    /// A `url` tag does not follow `-`, `<key>` or `<key>,omitempty`.
    #[display("failed to parse url tag {tag:?}: {reason}")]
    #[from(skip)]
    BadTagSyntax {
        /// The tag text as declared.
        #[error(not(source))]
        tag: String,
        /// What is wrong with it.
        #[error(not(source))]
        reason: &'static str,
    },

    // ------------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------------
    /// A value has no string form.
    #[display("failed to convert value of type {type_name:?} ({preview}) to string")]
    #[from(skip)]
    NotConvertible {
        /// Concrete type name.
        #[error(not(source))]
        type_name: &'static str,
        /// Value preview, truncated to 25 characters.
        #[error(not(source))]
        preview: String,
    },

    /// Encoding a field failed; `key` is the declared query key.
    #[display("failed to encode field {key:?}: {source}")]
    #[from(skip)]
    Field {
        /// Declared query key of the field.
        #[error(not(source))]
        key: String,
        /// Underlying failure.
        source: Box<Error>,
    },

    /// Encoding an embedded struct failed.
    #[display("failed to encode embedded struct {field:?}: {source}")]
    #[from(skip)]
    Embedded {
        /// Declaration name of the embedded field.
        #[error(not(source))]
        field: &'static str,
        /// Underlying failure.
        source: Box<Error>,
    },

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------
    /// An option in a chain failed; later options did not run.
    #[display("option {position} failed: {source}")]
    #[from(skip)]
    Step {
        /// 1-based position of the failing option in its chain.
        #[error(not(source))]
        position: usize,
        /// Underlying failure.
        source: Box<Error>,
    },

    // ------------------------------------------------------------------------
    // Protocol
    // ------------------------------------------------------------------------
    /// The response status is not in the allowed set.
    #[display("status code: {code}, message: {phrase:?}")]
    #[from(skip)]
    StatusCode {
        /// Received status code.
        #[error(not(source))]
        code: u16,
        /// Status line, e.g. `404 Not Found`.
        #[error(not(source))]
        phrase: String,
    },

    /// The advertised content length is missing, malformed, or above the ceiling.
    #[display("content length {} exceeded max length {ceiling}", display_length(*actual))]
    #[from(skip)]
    MaxContentLength {
        /// Maximum accepted length.
        #[error(not(source))]
        ceiling: u64,
        /// Advertised length, `None` when the header was missing or malformed.
        #[error(not(source))]
        actual: Option<u64>,
    },

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The request deadline passed before a response arrived.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request was cancelled through its context.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------
    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// The draft has no base URL yet.
    #[display("{_0}: requires base URL")]
    #[from(skip)]
    MissingBaseUrl(#[error(not(source))] &'static str),

    /// Header name or value rejected.
    #[display("invalid header {_0:?}")]
    #[from(skip)]
    InvalidHeader(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Reading or writing a body failed.
    #[display("body I/O error: {_0}")]
    #[from]
    Io(std::io::Error),
}

fn display_length(actual: Option<u64>) -> String {
    actual.map_or_else(|| "<unknown>".to_string(), |length| length.to_string())
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a bad tag syntax error.
    #[must_use]
    pub fn bad_tag(tag: impl Into<String>, reason: &'static str) -> Self {
        Self::BadTagSyntax {
            tag: tag.into(),
            reason,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with the position of the option that produced it.
    #[must_use]
    pub fn at_step(self, position: usize) -> Self {
        Self::Step {
            position,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping step, field and embedded wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Step { source, .. }
            | Self::Field { source, .. }
            | Self::Embedded { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Position of the outermost failing option, if this error came out of a chain.
    #[must_use]
    pub const fn step_position(&self) -> Option<usize> {
        match self {
            Self::Step { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Returns `true` if a response was received but rejected.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::StatusCode { .. } | Self::MaxContentLength { .. }
        )
    }

    /// Returns `true` if no response was received at all.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Connection(_) | Self::Tls(_) | Self::Timeout | Self::Cancelled
        )
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), Self::Timeout)
    }

    /// Returns the rejected status code if this is a status assertion failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Self::StatusCode { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::StatusCode {
            code: 404,
            phrase: "404 Not Found".to_string(),
        };
        assert_eq!(err.to_string(), r#"status code: 404, message: "404 Not Found""#);

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::MissingBaseUrl("path");
        assert_eq!(err.to_string(), "path: requires base URL");
    }

    #[test]
    fn max_content_length_display() {
        let err = Error::MaxContentLength {
            ceiling: 10,
            actual: Some(42),
        };
        assert_eq!(err.to_string(), "content length 42 exceeded max length 10");

        let err = Error::MaxContentLength {
            ceiling: 10,
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "content length <unknown> exceeded max length 10"
        );
    }

    #[test]
    fn step_wrapping() {
        let err = Error::Timeout.at_step(3);
        assert_eq!(err.step_position(), Some(3));
        assert_eq!(err.to_string(), "option 3 failed: request timeout");
        assert!(matches!(err.root_cause(), Error::Timeout));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn classification() {
        let rejected = Error::StatusCode {
            code: 500,
            phrase: "500 Internal Server Error".to_string(),
        }
        .at_step(1);
        assert!(rejected.is_protocol());
        assert!(!rejected.is_transport());
        assert_eq!(rejected.status(), Some(500));

        let unreachable = Error::connection("refused");
        assert!(unreachable.is_transport());
        assert!(!unreachable.is_protocol());
        assert_eq!(unreachable.status(), None);

        assert!(Error::Cancelled.is_transport());
        assert!(Error::Timeout.at_step(2).is_timeout());
    }

    #[test]
    fn field_error_names_key() {
        let err = Error::Field {
            key: "tags".to_string(),
            source: Box::new(Error::NotConvertible {
                type_name: "std::collections::HashMap<&str, i32>",
                preview: "{\"a\": 1}".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.starts_with(r#"failed to encode field "tags""#), "{msg}");
        assert!(matches!(err.root_cause(), Error::NotConvertible { .. }));
    }
}
