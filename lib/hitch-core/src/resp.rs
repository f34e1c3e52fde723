//! Response options.
//!
//! Each function returns a [`Step`] over a [`ResponseHandle`]. Combine them with a
//! [`ResponseChain`](crate::ResponseChain): validations first, then the option that consumes
//! the body.
//!
//! ```
//! use hitch_core::{Body, ResponseChain, ResponseHandle, Step, resp};
//! use http::{HeaderMap, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Pong { ok: bool }
//!
//! let mut handle = ResponseHandle::new(StatusCode::OK, HeaderMap::new(), Body::from_bytes(r#"{"ok":true}"#));
//! let mut pong = Pong::default();
//!
//! ResponseChain::new()
//!     .with(resp::allowed_status(resp::STATUS_2XX))
//!     .with(resp::decode_json(&mut pong))
//!     .apply(&mut handle)
//!     .unwrap();
//! assert!(pong.ok);
//! ```

use std::io::Write;

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, Json};
use crate::pipeline::Step;
use crate::{Error, ResponseHandle, Result};

/// Every 2xx status code with a registered meaning.
pub const STATUS_2XX: [StatusCode; 10] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::NON_AUTHORITATIVE_INFORMATION,
    StatusCode::NO_CONTENT,
    StatusCode::RESET_CONTENT,
    StatusCode::PARTIAL_CONTENT,
    StatusCode::MULTI_STATUS,
    StatusCode::ALREADY_REPORTED,
    StatusCode::IM_USED,
];

/// Copy the body into `sink`, leaving it fully readable for later options.
pub fn tee<W: Write + Send + ?Sized>(sink: &mut W) -> impl Step<ResponseHandle> + Send + '_ {
    move |handle: &mut ResponseHandle| {
        let mut sink = WriteRef(&mut *sink);
        handle.body_mut().tee(&mut sink)
    }
}

/// Decode the body with `C` into `target`. The body is closed whatever the outcome.
///
/// `target` is only written on success.
pub fn decode<'a, C: Codec + 'static, T: DeserializeOwned + Send>(
    target: &'a mut T,
) -> impl Step<ResponseHandle> + Send + 'a {
    move |handle: &mut ResponseHandle| {
        let body = handle.body_mut();
        let decoded = C::decode(&mut *body);
        body.close();
        *target = decoded?;
        Ok(())
    }
}

/// Decode a JSON body into `target`.
pub fn decode_json<T: DeserializeOwned + Send>(
    target: &mut T,
) -> impl Step<ResponseHandle> + Send + '_ {
    decode::<Json, T>(target)
}

/// Read the body as UTF-8 text into `target`, then close it.
pub fn text(target: &mut String) -> impl Step<ResponseHandle> + Send + '_ {
    move |handle: &mut ResponseHandle| {
        let bytes = handle.body_mut().to_bytes()?;
        *target = String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(())
    }
}

/// Read and discard the body, then close it.
pub fn drain() -> impl Step<ResponseHandle> + Send {
    |handle: &mut ResponseHandle| {
        handle.body_mut().drain()?;
        Ok(())
    }
}

/// Require the status code to be one of `allowed`.
///
/// # Errors
///
/// The option fails with [`Error::StatusCode`] carrying the code and status line.
pub fn allowed_status(allowed: impl IntoIterator<Item = StatusCode>) -> impl Step<ResponseHandle> + Send {
    let allowed: Vec<StatusCode> = allowed.into_iter().collect();
    move |handle: &mut ResponseHandle| {
        let status = handle.status();
        if allowed.contains(&status) {
            return Ok(());
        }
        Err(Error::StatusCode {
            code: status.as_u16(),
            phrase: handle.phrase(),
        })
    }
}

/// Require an advertised `Content-Length` no larger than `ceiling`.
///
/// # Errors
///
/// The option fails with [`Error::MaxContentLength`] when the header is missing, malformed,
/// or above `ceiling`.
pub fn max_content_length(ceiling: u64) -> impl Step<ResponseHandle> + Send {
    move |handle: &mut ResponseHandle| match handle.content_length() {
        Some(actual) if actual <= ceiling => Ok(()),
        actual => Err(Error::MaxContentLength { ceiling, actual }),
    }
}

/// Sized adapter so an unsized sink can be handed out as `dyn Write`.
struct WriteRef<'a, W: ?Sized>(&'a mut W);

impl<W: Write + ?Sized> Write for WriteRef<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}
