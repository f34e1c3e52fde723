//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use hitch_core::prelude::*;
//! ```

pub use crate::{
    AsText, Body, CancelToken, Chain, Codec, Context, EncodedValues, Error, Json, Method, Query,
    QueryValue, RequestChain, RequestDraft, ResponseChain, ResponseHandle, Result, Step,
    Transport, encode, req, resp,
};
