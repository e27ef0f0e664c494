/// Reserved output-store key holding the chain's original input.
pub const INPUT_KEY: &str = "input";

/// Parse an argument expression as a reference.
///
/// Returns `Some(key)` when the whole expression is `$` followed by one or
/// more `[A-Za-z0-9_]` characters (`"$input"` yields `Some("input")`).
/// Anything else is a literal: there is no partial or embedded substitution,
/// so `"$key extra"`, `"pre $key"`, and a bare `"$"` all return `None`.
#[must_use]
pub fn parse_reference(expr: &str) -> Option<&str> {
    let key = expr.strip_prefix('$')?;
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Some(key)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_expression_references() {
        assert_eq!(parse_reference("$input"), Some("input"));
        assert_eq!(parse_reference("$1"), Some("1"));
        assert_eq!(parse_reference("$scene_text"), Some("scene_text"));
    }

    #[test]
    fn near_misses_are_literals() {
        assert_eq!(parse_reference("input"), None);
        assert_eq!(parse_reference("$"), None);
        assert_eq!(parse_reference("$1 and more"), None);
        assert_eq!(parse_reference("prefix $1"), None);
        assert_eq!(parse_reference("$k-e-y"), None);
        assert_eq!(parse_reference(""), None);
    }
}
