//! Prompt construction for label classification.

use crate::pipeline::catalog::LabelCatalog;

/// Default number of body characters included in the classification input.
pub const DEFAULT_BODY_CHAR_LIMIT: usize = 1000;

/// Compose the text the classifier sees: the full snippet plus the first
/// `body_limit` characters of the body.
pub fn build_classification_input(snippet: &str, body: &str, body_limit: usize) -> String {
    let body_preview: String = body.chars().take(body_limit).collect();
    format!("Snippet: {snippet}\nBody: {body_preview}")
}

/// Build the single-label classification prompt.
///
/// Lists every catalog label verbatim, states the routing priorities, and
/// asks for a bare lowercase label as output. Well-formed even for empty
/// `text`.
pub fn build_prompt(catalog: &LabelCatalog, text: &str) -> String {
    let labels = catalog.joined();
    let fallback = catalog.fallback();

    let mut prompt = String::with_capacity(1024 + text.len());

    prompt.push_str(
        "You are an email classification system. Read the email below and assign it \
         to exactly one of these labels: ",
    );
    prompt.push_str(&labels);
    prompt.push_str(".\n\n");

    prompt.push_str("Instructions:\n");
    prompt.push_str("1. Read the email text carefully.\n");
    prompt.push_str(
        "2. Consider the sender, subject, and body to determine the primary intent.\n",
    );
    prompt.push_str("3. Choose the single best label from the list above. Never choose more than one.\n");
    prompt.push_str(
        "4. Receipts, invoices, and payment confirmations are labeled 'payments'.\n",
    );
    prompt.push_str(
        "5. Job application status updates and rejections are labeled 'job-application'; \
         interview requests and scheduling are labeled 'interview'.\n",
    );
    prompt.push_str("6. Newsletters and digests are labeled 'newsletter'.\n");
    prompt.push_str("7. Spam and junk are labeled 'spam'.\n");
    prompt.push_str(&format!(
        "8. If no label fits well, or there is nothing to classify, use '{fallback}'.\n\n"
    ));

    prompt.push_str("Email text:\n\"\"\"\n");
    prompt.push_str(text);
    prompt.push_str("\n\"\"\"\n\n");

    prompt.push_str(
        "Output format:\nReturn ONLY the label name in lowercase. \
         No other text, punctuation, or explanation.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_label_verbatim() {
        let catalog = LabelCatalog::default();
        let prompt = build_prompt(&catalog, "hello");
        assert!(prompt.contains(&catalog.joined()));
        for label in catalog.labels() {
            assert!(prompt.contains(label.as_str()), "missing {label}");
        }
    }

    #[test]
    fn prompt_states_routing_rules() {
        let prompt = build_prompt(&LabelCatalog::default(), "hello");
        assert!(prompt.contains("exactly one"));
        assert!(prompt.contains("labeled 'payments'"));
        assert!(prompt.contains("labeled 'job-application'"));
        assert!(prompt.contains("labeled 'interview'"));
        assert!(prompt.contains("labeled 'newsletter'"));
        assert!(prompt.contains("labeled 'spam'"));
        assert!(prompt.contains("use 'other'"));
        assert!(prompt.contains("ONLY the label name in lowercase"));
    }

    #[test]
    fn prompt_embeds_text() {
        let prompt = build_prompt(&LabelCatalog::default(), "Your invoice #123 is attached");
        assert!(prompt.contains("\"\"\"\nYour invoice #123 is attached\n\"\"\""));
    }

    #[test]
    fn prompt_is_well_formed_for_empty_text() {
        let prompt = build_prompt(&LabelCatalog::default(), "");
        assert!(prompt.contains("\"\"\"\n\n\"\"\""));
        assert!(prompt.ends_with("No other text, punctuation, or explanation."));
    }

    #[test]
    fn prompt_is_deterministic() {
        let catalog = LabelCatalog::default();
        assert_eq!(build_prompt(&catalog, "x"), build_prompt(&catalog, "x"));
    }

    #[test]
    fn prompt_uses_injected_catalog() {
        let catalog = LabelCatalog::new(["alpha", "beta"]).unwrap();
        let prompt = build_prompt(&catalog, "x");
        assert!(prompt.contains("labels: alpha, beta, other."));
        assert!(!prompt.contains("bank-alert"));
    }

    #[test]
    fn input_combines_snippet_and_body() {
        let input = build_classification_input("Quick note", "Full body", DEFAULT_BODY_CHAR_LIMIT);
        assert_eq!(input, "Snippet: Quick note\nBody: Full body");
    }

    #[test]
    fn input_truncates_body_but_not_snippet() {
        let snippet = "s".repeat(1500);
        let body = "b".repeat(1500);
        let input = build_classification_input(&snippet, &body, 1000);
        assert!(input.contains(&snippet));
        assert_eq!(input.matches('b').count(), 1000);
    }

    #[test]
    fn input_truncation_respects_char_boundaries() {
        let body = "é".repeat(1200);
        let input = build_classification_input("", &body, 1000);
        assert_eq!(input.chars().filter(|c| *c == 'é').count(), 1000);
    }
}
