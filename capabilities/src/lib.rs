//! Capability framework for Skein - the dispatch boundary of the chain engine.
//!
//! A capability is a named, externally provided operation: it takes a flat
//! string argument map and a cancellation handle, and produces an arbitrary
//! JSON result (a plain string in the common case, a file path or structured
//! data otherwise). The engine resolves `"<capability>.<operation>"` action
//! identifiers against a [`CapabilityRegistry`] built once at startup and
//! immutable thereafter - there is no global service-locator state.
//!
//! Built-in leaves live in [`output`] and [`media`]; built-in chain
//! declarations in [`chains`].

pub mod chains;
pub mod media;
pub mod output;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::future::AbortHandle;
use serde_json::Value;

pub use media::{MediaConfig, StockMedia};
pub use output::TextOutput;

/// Capability invocation future type alias.
pub type CapabilityFut<'a> = Pin<Box<dyn Future<Output = Result<Value, CapabilityError>> + Send + 'a>>;

/// A failure produced by a capability invocation.
///
/// Only [`CapabilityError::Transient`] failures are eligible for retry;
/// everything else indicates a configuration or programming error and
/// propagates immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Classified retry-eligible failure: timeout, rate limit, 5xx,
    /// connection error.
    #[error("transient failure: {reason}")]
    Transient { reason: String },
    /// The resolved argument map does not fit the operation's parameters.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The invocation observed the cancellation handle and unwound.
    #[error("invocation cancelled")]
    Cancelled,
    /// Any other terminal failure.
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }
}

/// An invocable operation exposed to the chain engine.
///
/// Implementations are stateless between calls: everything invocation-
/// specific arrives through the argument map and the cancellation handle.
/// In-flight work is responsible for honoring the handle itself; the engine
/// only guarantees a check at each step boundary.
pub trait Capability: Send + Sync {
    fn invoke<'a>(
        &'a self,
        args: &'a HashMap<String, String>,
        cancel: &'a AbortHandle,
    ) -> CapabilityFut<'a>;
}

/// Explicit mapping from action identifier to operation.
///
/// Populated at startup, then shared immutably (typically behind an `Arc`)
/// with every executor that needs it.
#[derive(Default)]
pub struct CapabilityRegistry {
    operations: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under its action identifier. A later
    /// registration under the same identifier replaces the earlier one.
    pub fn register(&mut self, action: impl Into<String>, capability: Arc<dyn Capability>) {
        self.operations.insert(action.into(), capability);
    }

    #[must_use]
    pub fn resolve(&self, action: &str) -> Option<Arc<dyn Capability>> {
        self.operations.get(action).cloned()
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&str> = self.actions().collect();
        actions.sort_unstable();
        f.debug_struct("CapabilityRegistry")
            .field("actions", &actions)
            .finish()
    }
}

/// Fetch a required argument, or fail with a parameter-shape mismatch.
pub fn required_arg<'a>(
    args: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, CapabilityError> {
    args.get(name)
        .map(String::as_str)
        .ok_or_else(|| CapabilityError::InvalidArguments(format!("missing argument `{name}`")))
}
