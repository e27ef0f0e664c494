//! The chain executor: drives a chain's thoughts through resolve,
//! dispatch, and store.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::AbortHandle;
use serde_json::Value;

use skein_capabilities::{CapabilityError, CapabilityRegistry};
use skein_types::{Chain, ChainValidationError, INPUT_KEY};

use crate::error::ExecuteError;
use crate::resolver::resolve_arguments;
use crate::retry::{RetryConfig, invoke_with_retry};

/// Executes chains against an injected capability registry.
///
/// The executor holds no per-invocation state: each [`ChainExecutor::execute`]
/// call owns its output store, so concurrent invocations (of the same chain
/// or different ones) are fully independent.
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    registry: Arc<CapabilityRegistry>,
    retry: RetryConfig,
}

impl ChainExecutor {
    #[must_use]
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run a chain to completion and return the final thought's result.
    ///
    /// Thoughts execute strictly in sequence: a step's result is stored
    /// under its output key before the next step's arguments resolve. The
    /// cancellation handle is checked before each step and passed into
    /// every capability invocation, so cancellation takes effect at the
    /// next step boundary at the latest.
    pub async fn execute(
        &self,
        chain: &Chain,
        input: &str,
        cancel: &AbortHandle,
    ) -> Result<Value, ExecuteError> {
        if input.trim().is_empty() {
            return Err(ExecuteError::InvalidInput);
        }
        // Length >= 1 is a construction-time invariant; guard here for
        // chains assembled without validation.
        if chain.thoughts().is_empty() {
            return Err(ChainValidationError::Empty.into());
        }

        let mut store: HashMap<String, Value> = HashMap::new();
        store.insert(INPUT_KEY.to_string(), Value::String(input.to_string()));

        let mut result = Value::Null;
        for (step, thought) in chain.thoughts().iter().enumerate() {
            if cancel.is_aborted() {
                tracing::info!(step, "chain execution cancelled at step boundary");
                return Err(ExecuteError::Cancelled { step });
            }

            tracing::debug!(
                step,
                action = %thought.action,
                output_key = %thought.output_key,
                "dispatching thought"
            );

            let resolved = resolve_arguments(&thought.arguments, &store).map_err(|e| {
                ExecuteError::MissingReference {
                    step,
                    output_key: thought.output_key.clone(),
                    argument: e.argument,
                    key: e.key,
                }
            })?;

            let capability = self.registry.resolve(&thought.action).ok_or_else(|| {
                ExecuteError::UnresolvedCapability {
                    step,
                    output_key: thought.output_key.clone(),
                    action: thought.action.clone(),
                }
            })?;

            let value = invoke_with_retry(|| capability.invoke(&resolved, cancel), &self.retry)
                .await
                .map_err(|source| match source {
                    CapabilityError::Cancelled => ExecuteError::Cancelled { step },
                    source => ExecuteError::Capability {
                        step,
                        output_key: thought.output_key.clone(),
                        source,
                    },
                })?;

            store.insert(thought.output_key.clone(), value.clone());
            result = value;
        }

        tracing::info!(steps = chain.thoughts().len(), "chain completed");
        Ok(result)
    }
}
