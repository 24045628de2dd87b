//! Resolve raw model output to a canonical label.
//!
//! Exact membership only: lowercase, trim, drop everything outside
//! `[a-z-]`, then look the token up in the catalog. No stemming, synonyms,
//! or fuzzy matching.

use crate::pipeline::catalog::{LabelCatalog, is_label_char};
use crate::pipeline::types::ClassificationResult;

/// Normalize raw model output to a candidate label token.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| is_label_char(*c))
        .collect()
}

/// Resolve model output against the catalog.
///
/// `None` (the model gave nothing) resolves to `Unrecognized("")`; output
/// that normalizes to a non-member resolves to `Unrecognized(token)`.
pub fn resolve(raw: Option<&str>, catalog: &LabelCatalog) -> ClassificationResult {
    let Some(raw) = raw else {
        return ClassificationResult::Unrecognized(String::new());
    };

    let token = normalize(raw);
    match catalog.get(&token) {
        Some(label) => ClassificationResult::Labeled(label.clone()),
        None => ClassificationResult::Unrecognized(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(name: &str) -> ClassificationResult {
        ClassificationResult::Labeled(LabelCatalog::default().get(name).unwrap().clone())
    }

    #[test]
    fn exact_label_resolves() {
        let catalog = LabelCatalog::default();
        assert_eq!(resolve(Some("payments"), &catalog), labeled("payments"));
        assert_eq!(resolve(Some("job-application"), &catalog), labeled("job-application"));
    }

    #[test]
    fn case_whitespace_and_punctuation_are_stripped() {
        let catalog = LabelCatalog::default();
        assert_eq!(resolve(Some("PAYMENTS!!"), &catalog), labeled("payments"));
        assert_eq!(resolve(Some("  Newsletter.\n"), &catalog), labeled("newsletter"));
        assert_eq!(resolve(Some("'spam'"), &catalog), labeled("spam"));
        assert_eq!(resolve(Some("**security-alert**"), &catalog), labeled("security-alert"));
    }

    #[test]
    fn unknown_label_is_unrecognized_with_token() {
        let catalog = LabelCatalog::default();
        assert_eq!(
            resolve(Some("banana"), &catalog),
            ClassificationResult::Unrecognized("banana".into())
        );
    }

    #[test]
    fn prose_is_not_fuzzy_matched() {
        let catalog = LabelCatalog::default();
        // Spaces are stripped, so prose collapses to one non-member token.
        assert_eq!(
            resolve(Some("The label is: payments"), &catalog),
            ClassificationResult::Unrecognized("thelabelispayments".into())
        );
        assert_eq!(
            resolve(Some("payment"), &catalog),
            ClassificationResult::Unrecognized("payment".into())
        );
    }

    #[test]
    fn digits_and_underscores_are_dropped() {
        let catalog = LabelCatalog::default();
        assert_eq!(resolve(Some("bank_alert"), &catalog), ClassificationResult::Unrecognized("bankalert".into()));
        assert_eq!(resolve(Some("1. spam"), &catalog), labeled("spam"));
    }

    #[test]
    fn none_is_unrecognized_empty() {
        assert_eq!(
            resolve(None, &LabelCatalog::default()),
            ClassificationResult::Unrecognized(String::new())
        );
    }

    #[test]
    fn empty_after_normalization_is_unrecognized() {
        assert_eq!(
            resolve(Some("!!!"), &LabelCatalog::default()),
            ClassificationResult::Unrecognized(String::new())
        );
    }

    #[test]
    fn membership_follows_injected_catalog() {
        let catalog = LabelCatalog::new(["alpha"]).unwrap();
        assert!(matches!(resolve(Some("Alpha"), &catalog), ClassificationResult::Labeled(l) if l.as_str() == "alpha"));
        assert!(matches!(resolve(Some("payments"), &catalog), ClassificationResult::Unrecognized(_)));
    }

    #[test]
    fn labeled_iff_normalized_token_in_catalog() {
        let catalog = LabelCatalog::default();
        let samples = [
            "payments", "PAYMENTS!!", " other ", "Other.", "banana", "", "job application",
            "job-application\n", "inter-view", "INTERVIEW", "spam?", "🙂spam", "travel2",
        ];
        for raw in samples {
            let token = normalize(raw);
            let result = resolve(Some(raw), &catalog);
            match result {
                ClassificationResult::Labeled(label) => {
                    assert!(catalog.contains(&token), "{raw:?}");
                    assert_eq!(label.as_str(), token);
                }
                ClassificationResult::Unrecognized(got) => {
                    assert!(!catalog.contains(&token), "{raw:?}");
                    assert_eq!(got, token);
                }
            }
        }
    }
}
