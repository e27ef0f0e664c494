//! Built-in chain declarations.
//!
//! These are static data consumed by an external router: each chain carries
//! a query example, an input example, and its reasoning so the router can
//! match a natural-language request to a chain. The engine only sees the
//! thought list.

use skein_types::{Chain, Thought};

/// Resolve a built-in chain by its short name.
#[must_use]
pub fn builtin(name: &str) -> Option<Chain> {
    match name {
        "stock-video" => Some(stock_video_chain()),
        _ => None,
    }
}

/// Names of all built-in chains.
#[must_use]
pub fn builtin_names() -> &'static [&'static str] {
    &["stock-video"]
}

/// Search for stock footage matching a phrase, download it, and report the
/// local file path.
#[must_use]
pub fn stock_video_chain() -> Chain {
    Chain::new(
        "Find stock footage of a sunset over the ocean.",
        "sunset over the ocean",
        "I can search a stock media provider for a video matching the phrase, \
         download the best rendition, and hand the local file path back as \
         the result.",
        vec![
            Thought::new("media.search_video", "1")
                .with_reasoning(
                    "Search the stock media provider for the phrase and \
                     download the first HD rendition to a local file.",
                )
                .with_criticism(
                    "The first HD match may not be the most relevant clip \
                     for an ambiguous phrase.",
                )
                .arg("query", "$input")
                .arg("orientation", "landscape"),
            Thought::new("output.text", "2")
                .with_reasoning(
                    "The file path is the answer; proxy it through as the \
                     chain result.",
                )
                .arg("text", "$1"),
        ],
    )
    .expect("built-in chain declaration is valid")
}
