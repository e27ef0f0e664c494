use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::reference::{INPUT_KEY, parse_reference};

/// One declarative step of a chain: an action to invoke, the arguments to
/// invoke it with, and the key under which the result is published.
///
/// `reasoning` and `criticism` are free-text rationale retained for
/// auditability. They never affect execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    /// Action identifier, `"<capability>.<operation>"`.
    pub action: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub criticism: String,
    /// Parameter name -> argument expression. An expression is wholly a
    /// reference (`$input` or `$<key>`) or wholly a literal.
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    /// Output-store key this step's result is published under.
    pub output_key: String,
}

impl Thought {
    pub fn new(action: impl Into<String>, output_key: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reasoning: String::new(),
            criticism: String::new(),
            arguments: BTreeMap::new(),
            output_key: output_key.into(),
        }
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    #[must_use]
    pub fn with_criticism(mut self, criticism: impl Into<String>) -> Self {
        self.criticism = criticism.into();
        self
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), expr.into());
        self
    }
}

/// A construction-time chain validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainValidationError {
    #[error("a chain must contain at least one thought")]
    Empty,
    #[error("thought {step} has an empty action identifier")]
    EmptyAction { step: usize },
    #[error("thought {step} has an empty output key")]
    EmptyOutputKey { step: usize },
    #[error("thought {step} uses the reserved output key `{INPUT_KEY}`")]
    ReservedOutputKey { step: usize },
    #[error("thought {step} reuses the output key `{key}`")]
    DuplicateOutputKey { step: usize, key: String },
    #[error(
        "thought {step}, argument `{argument}`: `${key}` does not name the input or an earlier thought's output key"
    )]
    UnknownReference {
        step: usize,
        argument: String,
        key: String,
    },
}

/// An ordered sequence of thoughts plus the router-facing metadata used to
/// select this chain for a request.
///
/// Chains are constructed once (typically at startup) and are read-only
/// thereafter; [`Chain::new`] validates eagerly so a malformed declaration
/// never reaches the executor. Chains built by deserialization should be
/// passed through [`Chain::validate`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    query_example: String,
    query_input_example: String,
    reasoning: String,
    thoughts: Vec<Thought>,
}

impl Chain {
    /// Build a chain, rejecting malformed declarations.
    ///
    /// Every reference expression must resolve to `$input` or to the output
    /// key of a strictly earlier thought; output keys must be unique,
    /// non-empty, and must not shadow the reserved `input` key.
    pub fn new(
        query_example: impl Into<String>,
        query_input_example: impl Into<String>,
        reasoning: impl Into<String>,
        thoughts: Vec<Thought>,
    ) -> Result<Self, ChainValidationError> {
        let chain = Self {
            query_example: query_example.into(),
            query_input_example: query_input_example.into(),
            reasoning: reasoning.into(),
            thoughts,
        };
        chain.validate()?;
        Ok(chain)
    }

    /// Re-run construction-time validation, for chains assembled without
    /// going through [`Chain::new`].
    pub fn validate(&self) -> Result<(), ChainValidationError> {
        if self.thoughts.is_empty() {
            return Err(ChainValidationError::Empty);
        }

        let mut known_keys: HashSet<&str> = HashSet::new();
        known_keys.insert(INPUT_KEY);

        for (step, thought) in self.thoughts.iter().enumerate() {
            if thought.action.trim().is_empty() {
                return Err(ChainValidationError::EmptyAction { step });
            }
            if thought.output_key.is_empty() {
                return Err(ChainValidationError::EmptyOutputKey { step });
            }
            if thought.output_key == INPUT_KEY {
                return Err(ChainValidationError::ReservedOutputKey { step });
            }

            for (argument, expr) in &thought.arguments {
                if let Some(key) = parse_reference(expr)
                    && !known_keys.contains(key)
                {
                    return Err(ChainValidationError::UnknownReference {
                        step,
                        argument: argument.clone(),
                        key: key.to_string(),
                    });
                }
            }

            // Published after the argument check so a self reference is
            // reported as unknown.
            if !known_keys.insert(&thought.output_key) {
                return Err(ChainValidationError::DuplicateOutputKey {
                    step,
                    key: thought.output_key.clone(),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn query_example(&self) -> &str {
        &self.query_example
    }

    #[must_use]
    pub fn query_input_example(&self) -> &str {
        &self.query_input_example
    }

    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    #[must_use]
    pub fn thoughts(&self) -> &[Thought] {
        &self.thoughts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(thoughts: Vec<Thought>) -> Result<Chain, ChainValidationError> {
        Chain::new("Example query.", "example input", "Because.", thoughts)
    }

    #[test]
    fn accepts_input_and_backward_references() {
        let chain = chain_of(vec![
            Thought::new("text.generate", "1").arg("prompt", "$input"),
            Thought::new("output.text", "2").arg("text", "$1"),
        ]);
        assert!(chain.is_ok());
    }

    #[test]
    fn rejects_empty_chain() {
        assert_eq!(chain_of(vec![]), Err(ChainValidationError::Empty));
    }

    #[test]
    fn rejects_forward_reference() {
        let err = chain_of(vec![
            Thought::new("text.generate", "1").arg("prompt", "$2"),
            Thought::new("output.text", "2").arg("text", "$1"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ChainValidationError::UnknownReference {
                step: 0,
                argument: "prompt".to_string(),
                key: "2".to_string(),
            }
        );
    }

    #[test]
    fn rejects_self_reference() {
        let err = chain_of(vec![
            Thought::new("text.generate", "1").arg("prompt", "$1"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ChainValidationError::UnknownReference { step: 0, .. }
        ));
    }

    #[test]
    fn rejects_duplicate_output_key() {
        let err = chain_of(vec![
            Thought::new("text.generate", "1").arg("prompt", "$input"),
            Thought::new("output.text", "1").arg("text", "$1"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ChainValidationError::DuplicateOutputKey {
                step: 1,
                key: "1".to_string(),
            }
        );
    }

    #[test]
    fn rejects_reserved_output_key() {
        let err = chain_of(vec![Thought::new("text.generate", "input")]).unwrap_err();
        assert_eq!(err, ChainValidationError::ReservedOutputKey { step: 0 });
    }

    #[test]
    fn rejects_empty_action_and_output_key() {
        assert_eq!(
            chain_of(vec![Thought::new("  ", "1")]),
            Err(ChainValidationError::EmptyAction { step: 0 })
        );
        assert_eq!(
            chain_of(vec![Thought::new("output.text", "")]),
            Err(ChainValidationError::EmptyOutputKey { step: 0 })
        );
    }

    #[test]
    fn literals_resembling_references_are_not_validated_as_references() {
        // "$1 please" is wholly a literal, so it is fine in the first step.
        let chain = chain_of(vec![
            Thought::new("text.generate", "1").arg("prompt", "$1 please"),
        ]);
        assert!(chain.is_ok());
    }

    #[test]
    fn serde_round_trip_preserves_declaration() {
        let chain = chain_of(vec![
            Thought::new("text.generate", "1")
                .with_reasoning("Generate a draft.")
                .with_criticism("The draft may need review.")
                .arg("prompt", "$input"),
        ])
        .unwrap();
        let json = serde_json::to_string(&chain).unwrap();
        let back: Chain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chain);
        assert!(back.validate().is_ok());
    }
}
