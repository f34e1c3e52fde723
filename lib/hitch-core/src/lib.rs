//! Core types and traits for hitch.
//!
//! This crate provides the pieces hitch is built from:
//! - [`QueryValue`] and [`stringify`] - value coercion into query strings
//! - [`parse_directive`] and [`FieldDirective`] - `url` / `url_sep` tag parsing
//! - [`Query`], [`encode`] and [`EncodedValues`] - tag-driven struct encoding
//! - [`Step`] and [`Chain`] - ordered, fail-fast option chains
//! - [`req`] and [`resp`] - request and response options
//! - [`RequestDraft`] and [`ResponseHandle`] - the states the chains operate on
//! - [`Transport`] - the seam to an HTTP implementation
//! - [`Error`] and [`Result`] - error handling
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod codec;
mod coerce;
mod context;
mod directive;
mod draft;
mod encode;
mod error;
mod handle;
mod method;
mod pipeline;
pub mod prelude;
pub mod req;
pub mod resp;
mod transport;
mod values;

pub use codec::{Codec, Json, from_json, to_json};
pub use coerce::{AsText, PREVIEW_LEN, Pointee, QueryValue, Value, preview, stringify};
pub use context::{CancelToken, Context};
pub use directive::{DirectiveCache, Directives, FieldDirective, parse_directive};
pub use draft::RequestDraft;
pub use encode::{EncodeInto, Field, FieldDef, Query, encode, encode_value};
pub use error::{Error, Result};
pub use handle::{Body, ByteStream, LineStream, ResponseHandle};
pub use method::Method;
pub use pipeline::{BoxStep, Chain, RequestChain, ResponseChain, Step};
pub use transport::Transport;
pub use values::EncodedValues;

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, header};
