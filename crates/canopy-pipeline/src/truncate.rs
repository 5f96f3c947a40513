//! Token-budget truncation over a byte-pair tokenizer
//!
//! Bounds free text to a maximum o200k_base token count, producing a
//! decoded prefix of the original text. The encoder is constructed once
//! and shared process-wide; the vocabulary is immutable.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

/// Marker appended when text was cut
const ELLIPSIS: &str = " ...";

/// Options for truncation
#[derive(Debug, Clone, Copy)]
pub struct TruncateOptions {
    /// Append a literal `" ..."` marker when text was cut
    pub add_ellipsis: bool,
}

impl Default for TruncateOptions {
    fn default() -> Self {
        Self { add_ellipsis: true }
    }
}

/// Truncation outcome with token accounting
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateMeta {
    /// The (possibly truncated) text
    pub text: String,
    /// Token count of the input
    pub original_token_count: usize,
    /// Token count of the output, including the ellipsis token when added
    pub final_token_count: usize,
    /// Whether the input exceeded the budget
    pub truncated: bool,
}

fn encoding() -> &'static CoreBPE {
    static ENCODING: OnceLock<CoreBPE> = OnceLock::new();
    ENCODING.get_or_init(|| tiktoken_rs::o200k_base().expect("o200k_base vocabulary is bundled"))
}

/// Truncate `text` to at most `max_tokens` tokens.
///
/// Text already within budget is returned unchanged, as is any text when
/// `max_tokens` is zero.
pub fn truncate_to_tokens(text: &str, max_tokens: usize, options: TruncateOptions) -> String {
    truncate_with_meta(text, max_tokens, options).text
}

/// Truncate `text` and report token accounting alongside the result
pub fn truncate_with_meta(text: &str, max_tokens: usize, options: TruncateOptions) -> TruncateMeta {
    if text.is_empty() {
        return TruncateMeta {
            text: String::new(),
            original_token_count: 0,
            final_token_count: 0,
            truncated: false,
        };
    }
    if max_tokens == 0 {
        // Invalid budget: pass the text through untouched
        return TruncateMeta {
            text: text.to_string(),
            original_token_count: 0,
            final_token_count: 0,
            truncated: false,
        };
    }

    let enc = encoding();
    let token_ids = enc.encode_ordinary(text);

    if token_ids.len() <= max_tokens {
        return TruncateMeta {
            text: text.to_string(),
            original_token_count: token_ids.len(),
            final_token_count: token_ids.len(),
            truncated: false,
        };
    }

    // Back off one id at a time if the cut lands inside a UTF-8 sequence
    let mut kept = &token_ids[..max_tokens];
    let decoded = loop {
        if kept.is_empty() {
            break String::new();
        }
        match enc.decode(kept.to_vec()) {
            Ok(text) => break text,
            Err(_) => kept = &kept[..kept.len() - 1],
        }
    };

    let mut out = decoded.trim_end().to_string();
    if options.add_ellipsis {
        out.push_str(ELLIPSIS);
    }

    TruncateMeta {
        text: out,
        original_token_count: token_ids.len(),
        final_token_count: kept.len() + usize::from(options.add_ellipsis),
        truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_under_budget_is_unchanged() {
        let text = "a short sentence";
        let meta = truncate_with_meta(text, 100, TruncateOptions::default());
        assert_eq!(meta.text, text);
        assert!(!meta.truncated);
        assert_eq!(meta.original_token_count, meta.final_token_count);
    }

    #[test]
    fn test_over_budget_is_truncated() {
        let text = long_text(1000);
        let meta = truncate_with_meta(&text, 250, TruncateOptions::default());

        assert!(meta.truncated);
        assert!(meta.original_token_count > 250);
        assert!(meta.final_token_count <= 251);
        assert!(meta.text.len() < text.len());
        assert!(meta.text.ends_with(" ..."));
    }

    #[test]
    fn test_without_ellipsis() {
        let text = long_text(1000);
        let meta = truncate_with_meta(&text, 50, TruncateOptions { add_ellipsis: false });

        assert!(meta.truncated);
        assert!(!meta.text.ends_with("..."));
        assert!(meta.final_token_count <= 50);
    }

    #[test]
    fn test_empty_input() {
        let meta = truncate_with_meta("", 10, TruncateOptions::default());
        assert_eq!(meta.text, "");
        assert!(!meta.truncated);
        assert_eq!(meta.original_token_count, 0);
        assert_eq!(meta.final_token_count, 0);
    }

    #[test]
    fn test_zero_budget_passes_through() {
        let text = long_text(100);
        let meta = truncate_with_meta(&text, 0, TruncateOptions::default());
        assert_eq!(meta.text, text);
        assert!(!meta.truncated);
        assert_eq!(meta.final_token_count, 0);
    }

    #[test]
    fn test_truncation_is_idempotent_under_budget() {
        let text = long_text(1000);
        let first = truncate_to_tokens(&text, 250, TruncateOptions { add_ellipsis: false });
        let second = truncate_to_tokens(&first, 250, TruncateOptions { add_ellipsis: false });
        assert_eq!(first, second);
    }

    #[test]
    fn test_multibyte_text_survives_truncation() {
        let text = "日本語のテキスト ".repeat(500);
        let meta = truncate_with_meta(&text, 100, TruncateOptions::default());
        assert!(meta.truncated);
        // Result must be valid UTF-8 and a prefix of the input modulo the marker
        assert!(text.starts_with(meta.text.trim_end_matches(" ...").trim_end()));
    }
}
