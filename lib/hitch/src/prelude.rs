//! Prelude module for convenient imports.
//!
//! ```
//! use hitch::prelude::*;
//! ```

pub use crate::{
    Body, CancelToken, Client, ClientConfig, Context, EncodedValues, Error, HyperTransport,
    LineStream, Method, Query, QueryValue, RequestChain, RequestDraft, ResponseChain,
    ResponseHandle, Result, StatusCode, Step, Transport, encode, header, req, resp,
};
pub use serde::{Deserialize, Serialize};
