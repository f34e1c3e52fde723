//! The transport seam.
//!
//! hitch never speaks HTTP itself; a [`Transport`] executes a finished [`RequestDraft`] and
//! hands back a [`ResponseHandle`]. The `hitch` crate ships a hyper-based one.

use std::future::Future;

use crate::{RequestDraft, ResponseHandle, Result};

/// Executes requests.
///
/// Implementations own connection pooling, TLS, and honoring the draft's
/// [`Context`](crate::Context) (deadline and cancellation).
pub trait Transport: Send + Sync {
    /// Execute `draft` and return the response.
    ///
    /// # Errors
    ///
    /// Returns a transport error when no response was received:
    /// - [`Error::Connection`](crate::Error::Connection) / [`Error::Tls`](crate::Error::Tls)
    /// - [`Error::Timeout`](crate::Error::Timeout) once the deadline passes
    /// - [`Error::Cancelled`](crate::Error::Cancelled) once the cancel token fires
    fn execute(&self, draft: RequestDraft) -> impl Future<Output = Result<ResponseHandle>> + Send;
}

impl<T: Transport> Transport for &T {
    fn execute(&self, draft: RequestDraft) -> impl Future<Output = Result<ResponseHandle>> + Send {
        (**self).execute(draft)
    }
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn execute(&self, draft: RequestDraft) -> impl Future<Output = Result<ResponseHandle>> + Send {
        (**self).execute(draft)
    }
}
