//! Material identifier extraction.
//!
//! Materials Project identifiers look like `mp-1234`. Users type them in any
//! letter case, so matching is case-insensitive and results are lowercased.

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

static RE_MATERIAL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)mp-\d+").unwrap());

/// Extract distinct material identifiers from free text.
///
/// Results are lowercased and keep first-occurrence order. Returns an empty
/// list when nothing matches.
pub fn extract_ids(text: &str) -> Vec<String> {
    RE_MATERIAL_ID
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Markdown link to the record page of the first identifier found in `context`.
///
/// Returns `None` when the text carries no identifier.
pub fn source_link(context: &str, base_url: &str) -> Option<String> {
    let id = extract_ids(context).into_iter().next()?;
    let url = format!("{}/{}", base_url.trim_end_matches('/'), id);
    Some(format!("[{}]({})", url, url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_ids_dedupes_case_insensitively() {
        assert_eq!(
            extract_ids("Compare Mp-121 and mp-121 with MP-55"),
            vec!["mp-121", "mp-55"]
        );
    }

    #[test]
    fn test_extract_ids_none() {
        assert!(extract_ids("What is the band gap of silicon?").is_empty());
        assert!(extract_ids("mp- without digits").is_empty());
        assert!(extract_ids("").is_empty());
    }

    #[test]
    fn test_extract_ids_takes_all_digits() {
        assert_eq!(extract_ids("see mp-1234, then mp-12"), vec!["mp-1234", "mp-12"]);
    }

    #[test]
    fn test_source_link() {
        let link = source_link(
            "Material ID: mp-149; Stability: Stable",
            "https://next-gen.materialsproject.org/materials/",
        );
        assert_eq!(
            link.as_deref(),
            Some("[https://next-gen.materialsproject.org/materials/mp-149](https://next-gen.materialsproject.org/materials/mp-149)")
        );
        assert!(source_link("no identifier here", "https://example.org").is_none());
    }

    fn id_case() -> impl Strategy<Value = String> {
        prop_oneof![Just("mp-"), Just("MP-"), Just("Mp-"), Just("mP-")].prop_map(String::from)
    }

    proptest! {
        #[test]
        fn prop_extracts_distinct_lowercase_in_order(
            ids in prop::collection::vec((id_case(), 0u32..500), 0..8),
            filler in "[a-z ,.?]{0,12}",
        ) {
            let text: String = ids
                .iter()
                .map(|(prefix, n)| format!("{}{}{}", filler, prefix, n))
                .collect::<Vec<_>>()
                .join(" ");

            let mut expected: Vec<String> = Vec::new();
            for (_, n) in &ids {
                let id = format!("mp-{}", n);
                if !expected.contains(&id) {
                    expected.push(id);
                }
            }

            prop_assert_eq!(extract_ids(&text), expected);
        }
    }
}
