/// Regex based extractor for `uses:` references in workflow and action files.
use std::sync::OnceLock;

use regex::Regex;

use crate::extraction::ReferenceExtractor;

/// Lexical form of a `uses:` value: optional quotes around a run of
/// reference characters.
const USES_PATTERN: &str = r#"uses:[ \t]*['"]?([0-9A-Za-z_:\-/@.]*)['"]?"#;

fn uses_regex() -> &'static Regex {
    static USES_RE: OnceLock<Regex> = OnceLock::new();
    USES_RE.get_or_init(|| Regex::new(USES_PATTERN).expect("uses pattern is a valid regex"))
}

/// Extracts `uses:` references from YAML workflow and action definitions.
pub struct UsesExtractor;

impl ReferenceExtractor for UsesExtractor {
    fn extract_references(&self, text: &str) -> Vec<String> {
        uses_regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_quotes_and_list_items() {
        let text = "steps:\n  - uses: 'actions/checkout@v4'\n  - uses: \"org/x@main\"\n";
        assert_eq!(
            UsesExtractor.extract_references(text),
            vec!["actions/checkout@v4", "org/x@main"]
        );
    }

    #[test]
    fn empty_value_yields_nothing() {
        assert!(UsesExtractor.extract_references("uses:\nname: x").is_empty());
    }
}
