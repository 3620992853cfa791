//! Placeholder substitution for manifest templates.
//!
//! Output-path and artifact-suffix templates use `{name}` placeholders
//! resolved from a flat key/value map. Unresolved placeholders render as
//! empty strings.

use regex::Regex;
use std::collections::HashMap;

/// Substitute `{name}` placeholders in `input` from `values`.
pub fn render(input: &str, values: &HashMap<String, String>) -> String {
    let re = Regex::new(r"\{([a-z_]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let key = caps.get(1).map_or("", |m| m.as_str());
        values.get(key).cloned().unwrap_or_default()
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_known_placeholders() {
        let rendered = render(
            "target/{triple}/production/{bin}",
            &values(&[("triple", "x86_64-unknown-linux-gnu"), ("bin", "pulsar")]),
        );
        assert_eq!(rendered, "target/x86_64-unknown-linux-gnu/production/pulsar");
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        assert_eq!(render("{bin}-{missing}", &values(&[("bin", "app")])), "app-");
    }
}
