//! Composable HTTP request/response option chains and tag-driven query encoding.
//!
//! Requests are built by running a [`RequestChain`] of small options over a
//! [`RequestDraft`]; responses are validated and consumed by a [`ResponseChain`]. Either
//! chain stops at the first failing option and reports its 1-based position.
//! `#[derive(Query)]` turns a struct into query parameters driven by `#[url(...)]` tags.
//!
//! # Example
//!
//! ```no_run
//! use hitch::prelude::*;
//!
//! #[derive(Query)]
//! pub struct Search {
//!     #[url("q")]
//!     pub text: String,
//!     #[url("tags,omitempty")]
//!     #[url_sep(",")]
//!     pub tags: Vec<String>,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! pub struct Page {
//!     total: u64,
//! }
//!
//! # async fn run() -> hitch::Result<()> {
//! let client = Client::new()?;
//! let search = Search { text: "rust".into(), tags: vec!["http".into(), "query".into()] };
//! let mut page = Page::default();
//!
//! client
//!     .send(
//!         RequestChain::new()
//!             .with(req::get())
//!             .with(req::base_url("https://api.example.com/search"))
//!             .with(req::query_struct(&search)),
//!         ResponseChain::new()
//!             .with(resp::allowed_status(resp::STATUS_2XX))
//!             .with(resp::decode_json(&mut page)),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod transport;

pub use client::{Client, request_factory};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::{CIPHER_SUITES, https_connector, tls_config};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use hitch_core::{
    AsText, BoxStep, CancelToken, Chain, Codec, Context, DirectiveCache, Directives, EncodeInto,
    EncodedValues, Error, Field, FieldDef, FieldDirective, Json, Method, PREVIEW_LEN, Pointee,
    Query, QueryValue, RequestChain, RequestDraft, ResponseChain, ResponseHandle, Result, Step,
    Transport, Value, encode, encode_value, from_json, parse_directive, preview, req, resp,
    stringify, to_json,
};
pub use hitch_core::{Body, ByteStream, LineStream};

// Re-export http types for status codes and headers
pub use hitch_core::{HeaderMap, StatusCode, header};

pub use url;

// Re-export macros
pub use hitch_macro::Query;
