//! Terminal output capability: proxies a resolved value to the user.

use std::collections::HashMap;

use futures_util::future::AbortHandle;
use serde_json::Value;

use crate::{Capability, CapabilityFut, required_arg};

/// `output.text`: logs the `text` argument and returns it unchanged.
///
/// The final thought of most chains is an output step, so the chain's
/// overall result is whatever this echoes back.
#[derive(Debug, Default)]
pub struct TextOutput;

impl Capability for TextOutput {
    fn invoke<'a>(
        &'a self,
        args: &'a HashMap<String, String>,
        _cancel: &'a AbortHandle,
    ) -> CapabilityFut<'a> {
        Box::pin(async move {
            let text = required_arg(args, "text")?;
            tracing::info!(%text, "chain output");
            Ok(Value::String(text.to_string()))
        })
    }
}
