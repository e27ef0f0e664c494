use skein_capabilities::CapabilityError;
use skein_types::ChainValidationError;

/// A chain execution failure.
///
/// Every variant that aborts a running chain carries the triggering step
/// index (and its output key where one exists) for diagnosis. Nothing is
/// downgraded to a default value: the executor recovers nothing locally
/// except transient-error retries, which the resilience wrapper owns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// The chain input was empty or whitespace. No steps ran.
    #[error("chain input must not be empty")]
    InvalidInput,
    /// The chain itself is malformed. Construction-time validation should
    /// have caught this; it surfaces here only for chains that bypassed it.
    #[error("invalid chain: {0}")]
    InvalidChain(#[from] ChainValidationError),
    /// An argument expression referenced a key with no stored value. The
    /// step was not dispatched.
    #[error(
        "step {step} (`{output_key}`): argument `{argument}` references `${key}`, which has no stored value"
    )]
    MissingReference {
        step: usize,
        output_key: String,
        argument: String,
        key: String,
    },
    /// No operation is registered under the thought's action identifier.
    /// A configuration error; never retried.
    #[error("step {step} (`{output_key}`): no capability registered for action `{action}`")]
    UnresolvedCapability {
        step: usize,
        output_key: String,
        action: String,
    },
    /// The capability failed terminally (transient retries, if any, are
    /// already exhausted; the original error is preserved as the source).
    #[error("step {step} (`{output_key}`): {source}")]
    Capability {
        step: usize,
        output_key: String,
        #[source]
        source: CapabilityError,
    },
    /// Cooperative cancellation, observed at the boundary of `step` or
    /// inside its invocation.
    #[error("execution cancelled at step {step}")]
    Cancelled { step: usize },
}
