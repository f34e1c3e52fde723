//! Tower middleware layers for the hitch transport.
//!
//! Layers wrap the boxed transport service through
//! [`HyperTransportBuilder::layer`](crate::HyperTransportBuilder::layer). Anything
//! implementing [`Layer`] over `Service<RequestDraft, Response = ResponseHandle>` fits,
//! including tower's own.
//!
//! # Example
//!
//! ```no_run
//! use hitch::HyperTransport;
//! use hitch::middleware::{ConcurrencyLimitLayer, LoggingLayer};
//!
//! # fn main() -> hitch::Result<()> {
//! let transport = HyperTransport::builder()
//!     .layer(LoggingLayer::debug())
//!     .layer(ConcurrencyLimitLayer::new(8))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
