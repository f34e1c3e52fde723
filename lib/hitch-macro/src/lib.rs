//! Procedural macros for hitch.
//!
//! This crate provides `#[derive(Query)]`, which generates the field table the query
//! encoder walks. Use it through the `hitch` crate, which re-exports it.

mod query_derive;

use proc_macro::TokenStream;

/// Derive the `Query` trait for a struct with named fields.
///
/// The generated impl lists every field in declaration order with its tags, and exposes
/// the values of `pub` fields that carry a `url` tag or are embedded. Tags are checked the
/// first time the type is encoded; a malformed tag makes every encode fail.
///
/// # Field Attributes
///
/// - `#[url("key")]` - Encode the field under `key`
/// - `#[url("key,omitempty")]` - Same, but skip zero values and empty strings
/// - `#[url("-")]` - Never encode the field
/// - `#[url_sep(",")]` - Join sequence values into one string with the given separator
/// - `#[url(embed)]` - Splice the encoding of a nested `Query` struct
///
/// Fields without a `url` attribute, and fields that are not `pub`, are left out.
///
/// # Example
///
/// ```ignore
/// use hitch::Query;
///
/// #[derive(Query)]
/// pub struct SearchParams {
///     #[url("q")]
///     pub text: String,
///     #[url("tags")]
///     #[url_sep(",")]
///     pub tags: Vec<String>,     // tags=a,b
///     #[url("page,omitempty")]
///     pub page: Option<u32>,     // absent when None or Some(0)
///     #[url(embed)]
///     pub paging: Paging,
///     #[url("-")]
///     pub api_key: String,
/// }
/// ```
#[proc_macro_derive(Query, attributes(url, url_sep))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    query_derive::expand_query_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
