//! Argument resolution: expression -> concrete value, against the output store.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use skein_types::parse_reference;

/// An argument expression referenced a key that has no stored value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("argument `{argument}` references `${key}`, which has no stored value")]
pub struct MissingReference {
    pub argument: String,
    pub key: String,
}

/// Resolve a thought's declared arguments against the output store.
///
/// Reference expressions substitute the stored value; everything else passes
/// through as a literal, unmodified. A stored string substitutes verbatim;
/// any other stored JSON value substitutes as its compact serialization.
/// Resolution is pure: deterministic and replayable given the same store.
pub fn resolve_arguments(
    arguments: &BTreeMap<String, String>,
    store: &HashMap<String, Value>,
) -> Result<HashMap<String, String>, MissingReference> {
    let mut resolved = HashMap::with_capacity(arguments.len());
    for (name, expr) in arguments {
        let value = match parse_reference(expr) {
            Some(key) => match store.get(key) {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None => {
                    return Err(MissingReference {
                        argument: name.clone(),
                        key: key.to_string(),
                    });
                }
            },
            None => expr.clone(),
        };
        resolved.insert(name.clone(), value);
    }
    Ok(resolved)
}
