//! Placeholder interpolation for validation messages.
//!
//! Error and success messages are stored as templates with `{Key}` tokens
//! and rendered against the placeholder map returned alongside a validation
//! outcome. Substitution is global (every occurrence of a known key) and
//! tolerant: unknown tokens are left verbatim so a half-configured template
//! still renders something inspectable instead of throwing or stripping.

use std::collections::HashMap;

/// Substitute `{Key}` tokens in `template` with values from `values`.
///
/// - An empty template renders as an empty string.
/// - Every occurrence of a known key is replaced, not just the first.
/// - Unknown tokens (and stray braces) are passed through verbatim.
/// - Idempotent once fully resolved: a second pass with the same map is a
///   no-op because no `{..}` tokens remain.
pub fn interpolate(template: &str, values: &HashMap<String, String>) -> String {
    if template.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) => {
                let key = &after_open[..close];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        // Unknown token stays verbatim
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // Unclosed brace: emit the remainder untouched
                out.push('{');
                rest = after_open;
                break;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Render an optional template, treating `None` as an empty template.
pub fn interpolate_opt(template: Option<&str>, values: &HashMap<String, String>) -> String {
    template.map_or_else(String::new, |t| interpolate(t, values))
}
