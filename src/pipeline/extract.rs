//! Plain-text extraction from provider message payloads.
//!
//! Pure string handling: never fails. Missing or undecodable structure
//! degrades to the snippet, then to an empty string.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::debug;

use crate::mail::{MailMessage, MessagePart};

/// base64url, padding optional (the provider's body encoding).
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet, padding optional. Accepted as a fallback.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extract the plain-text body of a message.
///
/// - Inline payload (no parts): its body data is decoded.
/// - Multipart: every `text/plain` part, depth-first in order, concatenated.
/// - Nothing usable: the snippet, else `""`.
pub fn extract_body(message: &MailMessage) -> String {
    let body = message
        .payload
        .as_ref()
        .map(payload_text)
        .unwrap_or_default();

    if !body.is_empty() {
        return body;
    }

    message.snippet.clone().unwrap_or_default()
}

fn payload_text(payload: &MessagePart) -> String {
    match payload.parts.as_deref() {
        Some(parts) if !parts.is_empty() => {
            let mut out = String::new();
            collect_plain_text(parts, &mut out);
            out
        }
        _ => payload.data().and_then(decode_body_data).unwrap_or_default(),
    }
}

fn collect_plain_text(parts: &[MessagePart], out: &mut String) {
    for part in parts {
        if let Some(children) = part.parts.as_deref() {
            collect_plain_text(children, out);
        }
        if part.is_plain_text()
            && let Some(text) = part.data().and_then(decode_body_data)
        {
            out.push_str(&text);
        }
    }
}

/// Decode base64url (or standard base64) body data as lossy UTF-8.
pub fn decode_body_data(data: &str) -> Option<String> {
    let data = data.trim();
    let bytes = URL_SAFE_LENIENT
        .decode(data)
        .or_else(|_| STANDARD_LENIENT.decode(data));

    match bytes {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!(error = %e, len = data.len(), "Skipping undecodable body data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text)
    }

    fn message(snippet: Option<&str>, payload: Option<MessagePart>) -> MailMessage {
        MailMessage {
            id: "m1".into(),
            snippet: snippet.map(str::to_string),
            label_ids: vec![],
            payload,
        }
    }

    #[test]
    fn concatenates_plain_text_parts_in_order() {
        let payload = MessagePart::multipart(
            "multipart/mixed",
            vec![
                MessagePart::leaf("text/plain", encode("Hello ")),
                MessagePart::leaf("application/pdf", encode("%PDF-1.4")),
                MessagePart::leaf("text/plain", encode("world")),
            ],
        );
        assert_eq!(extract_body(&message(Some("snip"), Some(payload))), "Hello world");
    }

    #[test]
    fn ignores_html_alternative() {
        let payload = MessagePart::multipart(
            "multipart/alternative",
            vec![
                MessagePart::leaf("text/plain", encode("plain")),
                MessagePart::leaf("text/html", encode("<p>html</p>")),
            ],
        );
        assert_eq!(extract_body(&message(None, Some(payload))), "plain");
    }

    #[test]
    fn descends_into_nested_multipart() {
        let payload = MessagePart::multipart(
            "multipart/mixed",
            vec![
                MessagePart::multipart(
                    "multipart/alternative",
                    vec![
                        MessagePart::leaf("text/plain", encode("Invoice attached. ")),
                        MessagePart::leaf("text/html", encode("<b>Invoice</b>")),
                    ],
                ),
                MessagePart::leaf("text/plain", encode("Thanks")),
            ],
        );
        assert_eq!(
            extract_body(&message(None, Some(payload))),
            "Invoice attached. Thanks"
        );
    }

    #[test]
    fn decodes_inline_payload() {
        let payload = MessagePart::leaf("text/plain", encode("Inline body"));
        assert_eq!(extract_body(&message(Some("snip"), Some(payload))), "Inline body");
    }

    #[test]
    fn snippet_only_returns_snippet() {
        assert_eq!(
            extract_body(&message(Some("Your invoice #123 is attached"), None)),
            "Your invoice #123 is attached"
        );
    }

    #[test]
    fn neither_body_nor_snippet_returns_empty() {
        assert_eq!(extract_body(&message(None, None)), "");
    }

    #[test]
    fn multipart_without_plain_text_falls_back_to_snippet() {
        let payload = MessagePart::multipart(
            "multipart/alternative",
            vec![MessagePart::leaf("text/html", encode("<p>only html</p>"))],
        );
        assert_eq!(extract_body(&message(Some("preview"), Some(payload))), "preview");
    }

    #[test]
    fn empty_payload_structure_falls_back() {
        let payload = MessagePart {
            mime_type: None,
            body: None,
            parts: Some(vec![]),
        };
        assert_eq!(extract_body(&message(Some("preview"), Some(payload))), "preview");
    }

    #[test]
    fn undecodable_part_is_skipped() {
        let payload = MessagePart::multipart(
            "multipart/mixed",
            vec![
                MessagePart::leaf("text/plain", "!!!not base64!!!"),
                MessagePart::leaf("text/plain", encode("kept")),
            ],
        );
        assert_eq!(extract_body(&message(None, Some(payload))), "kept");
    }

    #[test]
    fn decode_accepts_padding_and_standard_alphabet() {
        assert_eq!(decode_body_data("SGk=").as_deref(), Some("Hi"));
        assert_eq!(decode_body_data("SGk").as_deref(), Some("Hi"));
        // "??>" encodes to "Pz8+" in standard and "Pz8-" in url-safe.
        assert_eq!(decode_body_data(&STANDARD.encode("??>")).as_deref(), Some("??>"));
        assert_eq!(decode_body_data("Pz8-").as_deref(), Some("??>"));
    }

    #[test]
    fn decode_invalid_utf8_is_lossy() {
        let data = URL_SAFE_NO_PAD.encode([0x48, 0x69, 0xff]);
        assert_eq!(decode_body_data(&data).as_deref(), Some("Hi\u{fffd}"));
    }
}
