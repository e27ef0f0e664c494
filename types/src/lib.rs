//! Chain and thought data model for Skein.
//!
//! A [`Chain`] is an ordered sequence of [`Thought`]s. Each thought names a
//! capability operation to invoke, the arguments to invoke it with, and the
//! key under which its result is published for later thoughts to reference.
//!
//! Argument expressions are stringly typed by design (it is the public,
//! router-facing declaration format), but reference syntax is validated once
//! at chain construction so malformed chains are rejected before anything
//! executes.

mod chain;
mod reference;

pub use chain::{Chain, ChainValidationError, Thought};
pub use reference::{INPUT_KEY, parse_reference};
