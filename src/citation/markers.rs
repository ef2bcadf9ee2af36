//! Citation marker normalization.
//!
//! Models emit citations as `[[Citation:2]]`, `[citation:2]`, `[[citation:2]`
//! and so on. Everything is rewritten to the canonical `[citation](2)` link
//! form the renderer understands.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

// Order matters: each rule runs to a fixed point before the next one starts.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    [
        (r"\[\[[Cc]itation", "[citation"),
        (r"[Cc]itation:(\d+)\]\]", "citation:${1}]"),
        (r"\[\[(Citation|citation):(\d+)\]\]", "[${1}:${2}]"),
        (r"\[[Cc]itation:(\d+)\]", "[citation](${1})"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        Regex::new(pattern).ok().map(|pattern| Rule {
            pattern,
            replacement,
        })
    })
    .collect()
});

/// Rewrite every citation marker to `[citation](N)`. Idempotent.
pub fn normalize_markers(text: &str) -> String {
    let mut current = text.to_string();
    for rule in RULES.iter() {
        loop {
            match rule.pattern.replace_all(&current, rule.replacement) {
                Cow::Borrowed(_) => break,
                Cow::Owned(next) => current = next,
            }
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_bracket_capitalized() {
        assert_eq!(
            normalize_markers("see [[Citation:2]] here"),
            "see [citation](2) here"
        );
    }

    #[test]
    fn single_bracket_forms() {
        assert_eq!(normalize_markers("[Citation:1]"), "[citation](1)");
        assert_eq!(normalize_markers("[citation:12]"), "[citation](12)");
        assert_eq!(normalize_markers("a [[citation:3]] b"), "a [citation](3) b");
    }

    #[test]
    fn half_doubled_markers() {
        assert_eq!(normalize_markers("[[Citation:4]"), "[citation](4)");
        assert_eq!(normalize_markers("[Citation:5]]"), "[citation](5)");
    }

    #[test]
    fn nested_brackets_collapse_fully() {
        let once = normalize_markers("[[[citation:1]]");
        assert_eq!(once, "[citation](1)");
        assert_eq!(normalize_markers(&once), once);
    }

    #[test]
    fn canonical_and_plain_text_untouched() {
        let text = "Rates rose [citation](1), see [citation](2). No markers: [x](y)";
        assert_eq!(normalize_markers(text), text);
        assert_eq!(normalize_markers(""), "");
    }

    #[test]
    fn markers_without_number_are_left_alone() {
        assert_eq!(normalize_markers("[citation:abc]"), "[citation:abc]");
    }
}
