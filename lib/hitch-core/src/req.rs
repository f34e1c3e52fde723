//! Request options.
//!
//! Each function returns a [`Step`] over a [`RequestDraft`]. Combine them with a
//! [`RequestChain`](crate::RequestChain); order matters, e.g. [`base_url`] must run before
//! [`path`].
//!
//! ```
//! use hitch_core::{RequestChain, RequestDraft, Step, req};
//!
//! let mut chain = RequestChain::new()
//!     .with(req::get())
//!     .with(req::base_url("https://h/"))
//!     .with(req::query("a", 1))
//!     .with(req::query("a", 2));
//!
//! let mut draft = RequestDraft::new();
//! chain.apply(&mut draft).unwrap();
//! assert_eq!(draft.url().unwrap().query(), Some("a=1&a=2"));
//! ```

use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::codec::{Codec, Json};
use crate::coerce::{QueryValue, stringify};
use crate::encode::{Query, encode};
use crate::pipeline::Step;
use crate::{CancelToken, Context, EncodedValues, Error, Method, RequestDraft, Result};

/// Set the HTTP method.
pub fn method(method: Method) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| {
        draft.set_method(method);
        Ok(())
    }
}

macro_rules! method_shortcuts {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            #[doc = concat!("Set the method to `", stringify!($variant), "`.")]
            pub fn $name() -> impl Step<RequestDraft> + Send {
                method(Method::$variant)
            }
        )*
    };
}

method_shortcuts! {
    get => Get,
    head => Head,
    post => Post,
    put => Put,
    patch => Patch,
    delete => Delete,
    connect => Connect,
    options => Options,
    trace => Trace,
}

/// Attach a cancellation/deadline context, replacing the current one.
pub fn context(context: Context) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| {
        draft.set_context(context.clone());
        Ok(())
    }
}

/// Set a deadline `timeout` after the option runs, keeping any cancel token.
pub fn timeout(timeout: Duration) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| {
        let context = draft.context().clone().with_timeout(timeout);
        draft.set_context(context);
        Ok(())
    }
}

/// Set an absolute deadline, keeping any cancel token.
pub fn deadline(deadline: Instant) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| {
        let context = draft.context().clone().with_deadline(deadline);
        draft.set_context(context);
        Ok(())
    }
}

/// Attach a cancel token, keeping any deadline.
pub fn cancel_on(token: CancelToken) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| {
        let context = draft.context().clone().with_cancel(token.clone());
        draft.set_context(context);
        Ok(())
    }
}

/// Add one header value. Existing values for the same name are kept.
///
/// # Errors
///
/// The option fails with [`Error::InvalidHeader`] when the name or value is not valid.
pub fn header(name: impl Into<String>, value: impl Into<String>) -> impl Step<RequestDraft> + Send {
    let name = name.into();
    let value = value.into();
    move |draft: &mut RequestDraft| {
        let (name, value) = header_pair(&name, &value)?;
        draft.headers_mut().append(name, value);
        Ok(())
    }
}

/// Add a `User-Agent` value.
pub fn user_agent(user_agent: impl Into<String>) -> impl Step<RequestDraft> + Send {
    header(header::USER_AGENT.as_str(), user_agent)
}

/// Set basic-auth credentials, replacing any `Authorization` header.
pub fn basic_auth(
    username: impl Into<String>,
    password: impl Into<String>,
) -> impl Step<RequestDraft> + Send {
    let value = basic_auth_value(&username.into(), &password.into());
    move |draft: &mut RequestDraft| {
        let value =
            HeaderValue::from_str(&value).map_err(|_| Error::InvalidHeader("authorization".into()))?;
        draft.headers_mut().insert(header::AUTHORIZATION, value);
        Ok(())
    }
}

/// `Basic <base64(username:password)>`.
#[must_use]
pub fn basic_auth_value(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}

/// Set the base URL, replacing scheme, host, path and query wholesale.
pub fn base_url(base: impl Into<String>) -> impl Step<RequestDraft> + Send {
    let base = base.into();
    move |draft: &mut RequestDraft| {
        draft.set_url(Url::parse(&base)?);
        Ok(())
    }
}

/// Set or replace the path.
///
/// # Errors
///
/// The option fails with [`Error::MissingBaseUrl`] when no base URL was set before.
pub fn path(path: impl Into<String>) -> impl Step<RequestDraft> + Send {
    let path = path.into();
    move |draft: &mut RequestDraft| {
        draft.require_url("path")?.set_path(&path);
        Ok(())
    }
}

/// Append a trailing `/` to the path when it lacks one.
pub fn append_slash() -> impl Step<RequestDraft> + Send {
    |draft: &mut RequestDraft| {
        let url = draft.require_url("append_slash")?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(())
    }
}

/// Install a raw body.
pub fn body(body: impl Into<Bytes>) -> impl Step<RequestDraft> + Send {
    let body = body.into();
    move |draft: &mut RequestDraft| {
        draft.set_body(body.clone());
        Ok(())
    }
}

/// Marshal `value` with `C` and install it as the body, setting `Content-Type`.
pub fn encoded<'a, C: Codec + 'static, T: Serialize + Sync + ?Sized>(
    value: &'a T,
) -> impl Step<RequestDraft> + Send + 'a {
    move |draft: &mut RequestDraft| {
        let bytes = C::encode(value)?;
        draft.set_body(bytes);
        draft.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(C::CONTENT_TYPE),
        );
        Ok(())
    }
}

/// Marshal `value` as JSON and install it as the body.
pub fn json<T: Serialize + Sync + ?Sized>(value: &T) -> impl Step<RequestDraft> + Send + '_ {
    encoded::<Json, T>(value)
}

/// Append one query parameter, merging with the existing query.
///
/// Sequences add one value per element.
///
/// # Errors
///
/// The option fails with [`Error::Field`] when the value cannot be converted, or with
/// [`Error::MissingBaseUrl`] when no base URL was set before.
pub fn query<V: QueryValue + Send>(key: impl Into<String>, value: V) -> impl Step<RequestDraft> + Send {
    let key = key.into();
    move |draft: &mut RequestDraft| {
        let strings = stringify(&value, None).map_err(|source| Error::Field {
            key: key.clone(),
            source: Box::new(source),
        })?;
        let added = strings.into_iter().map(|s| (key.as_str(), s)).collect();
        draft.merge_query("query", added)
    }
}

/// Append the whole encoding of a [`Query`] struct, merging with the existing query.
pub fn query_struct<T: Query + Sync>(value: &T) -> impl Step<RequestDraft> + Send + '_ {
    move |draft: &mut RequestDraft| {
        let encoded = encode(value)?;
        draft.merge_query("query_struct", encoded)
    }
}

/// Append already-encoded values, merging with the existing query.
pub fn query_values(values: EncodedValues) -> impl Step<RequestDraft> + Send {
    move |draft: &mut RequestDraft| draft.merge_query("query_values", values.clone())
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.to_string()))?;
    Ok((header_name, header_value))
}
