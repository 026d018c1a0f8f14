//! Small text helpers shared by the client and the server.

/// Clean up a model-generated title.
///
/// Strips surrounding quotes and asterisks, then trailing punctuation
/// (ASCII and full-width).
pub fn trim_topic(topic: &str) -> String {
    const WRAPPERS: &[char] = &['"', '\'', '*', '“', '”', '「', '」', '《', '》'];
    const TRAILING: &[char] = &[
        '.', ',', '!', '?', ':', ';', '，', '。', '！', '？', '：', '；', '、',
    ];

    let mut s = topic.trim();
    loop {
        let next = s
            .trim_start_matches(WRAPPERS)
            .trim_end_matches(WRAPPERS)
            .trim_end_matches(TRAILING)
            .trim();
        if next.len() == s.len() {
            break;
        }
        s = next;
    }
    s.to_owned()
}

/// Mask an identifier for logs: first three characters, then `***`.
pub fn mask_identifier(identifier: &str) -> String {
    let prefix: String = identifier.chars().take(3).collect();
    format!("{prefix}***")
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_topic_strips_quotes_and_punctuation() {
        assert_eq!(trim_topic("\"Rust Borrow Checker Basics.\""), "Rust Borrow Checker Basics");
        assert_eq!(trim_topic("**Travel Plans**"), "Travel Plans");
        assert_eq!(trim_topic("  Weekend Recipes!?  "), "Weekend Recipes");
    }

    #[test]
    fn trim_topic_handles_full_width_punctuation() {
        assert_eq!(trim_topic("“学习计划”。"), "学习计划");
    }

    #[test]
    fn trim_topic_of_empty_is_empty() {
        assert_eq!(trim_topic("  \"\"  "), "");
    }

    #[test]
    fn mask_identifier_keeps_prefix() {
        assert_eq!(mask_identifier("alice@example.com"), "ali***");
        assert_eq!(mask_identifier("+1"), "+1***");
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one  two\nthree"), 3);
        assert_eq!(word_count(""), 0);
    }
}
