//! Ordered, fail-fast option chains.
//!
//! A [`Step`] mutates some state or fails. A [`Chain`] applies its steps left to right and
//! stops at the first failure, reporting the 1-based position of the failing step through
//! [`Error::Step`](crate::Error::Step). Mutations made by earlier steps are kept.
//!
//! ```
//! use hitch_core::{Chain, RequestDraft, Step, req};
//!
//! let mut chain = Chain::new()
//!     .with(req::post())
//!     .with(req::base_url("https://api.example.com/v1"))
//!     .with(req::path("/users"));
//!
//! let mut draft = RequestDraft::new();
//! chain.apply(&mut draft).unwrap();
//! assert_eq!(draft.url().unwrap().as_str(), "https://api.example.com/users");
//! ```

use std::fmt;

use crate::draft::RequestDraft;
use crate::handle::ResponseHandle;
use crate::Result;

/// A transformation over `S` that may fail.
pub trait Step<S> {
    /// Apply this step to `state`.
    ///
    /// # Errors
    ///
    /// Returns the step's own failure; the caller decides how to report it.
    fn apply(&mut self, state: &mut S) -> Result<()>;
}

impl<S, F> Step<S> for F
where
    F: FnMut(&mut S) -> Result<()>,
{
    fn apply(&mut self, state: &mut S) -> Result<()> {
        self(state)
    }
}

/// Boxed step stored in a [`Chain`].
pub type BoxStep<'a, S> = Box<dyn Step<S> + Send + 'a>;

/// Ordered sequence of steps, itself a [`Step`].
pub struct Chain<'a, S> {
    steps: Vec<BoxStep<'a, S>>,
}

/// Chain of request options.
pub type RequestChain<'a> = Chain<'a, RequestDraft>;

/// Chain of response options.
pub type ResponseChain<'a> = Chain<'a, ResponseHandle>;

impl<'a, S> Chain<'a, S> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step, builder style.
    #[must_use]
    pub fn with(mut self, step: impl Step<S> + Send + 'a) -> Self {
        self.push(step);
        self
    }

    /// Appends a step.
    pub fn push(&mut self, step: impl Step<S> + Send + 'a) {
        self.steps.push(Box::new(step));
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<S> Step<S> for Chain<'_, S> {
    fn apply(&mut self, state: &mut S) -> Result<()> {
        for (index, step) in self.steps.iter_mut().enumerate() {
            if let Err(err) = step.apply(state) {
                let position = index + 1;
                tracing::debug!(position, error = %err, "option failed");
                return Err(err.at_step(position));
            }
        }
        Ok(())
    }
}

impl<S> Default for Chain<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Chain<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl<'a, S> Extend<BoxStep<'a, S>> for Chain<'a, S> {
    fn extend<I: IntoIterator<Item = BoxStep<'a, S>>>(&mut self, iter: I) {
        self.steps.extend(iter);
    }
}

impl<'a, S> FromIterator<BoxStep<'a, S>> for Chain<'a, S> {
    fn from_iter<I: IntoIterator<Item = BoxStep<'a, S>>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}
