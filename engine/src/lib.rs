//! Chain execution engine for Skein.
//!
//! The engine drives a validated [`skein_types::Chain`] step by step: for
//! each thought it resolves the declared argument expressions against the
//! per-invocation output store, dispatches the named capability through the
//! injected [`skein_capabilities::CapabilityRegistry`], retries transient
//! failures with bounded exponential backoff, and stores the result under
//! the thought's output key. The final thought's result is the chain's
//! result.
//!
//! Execution is strictly sequential within one invocation; separate
//! invocations are fully independent (each owns its output store), so the
//! engine needs no locks. Cancellation is a [`futures_util::future::AbortHandle`]
//! checked at every step boundary and passed into every capability
//! invocation.

mod error;
mod executor;
mod resolver;
mod retry;

pub use error::ExecuteError;
pub use executor::ChainExecutor;
pub use resolver::{MissingReference, resolve_arguments};
pub use retry::{RetryConfig, invoke_with_retry};
