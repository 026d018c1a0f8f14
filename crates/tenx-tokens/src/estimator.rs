//! Character-class token estimator.
//!
//! Costs are tracked in quarter tokens so the sum stays exact:
//!
//! | Character | Cost |
//! |-----------|------|
//! | ASCII `'A'..='z'` | 1/4 |
//! | other ASCII | 1/2 |
//! | non-ASCII | 3/2 |
//!
//! The total is rounded up to whole tokens.

use tenx_core::messages::ChatMessage;

const QUARTERS_LETTER: u64 = 1;
const QUARTERS_OTHER_ASCII: u64 = 2;
const QUARTERS_NON_ASCII: u64 = 6;

fn char_quarters(c: char) -> u64 {
    if !c.is_ascii() {
        QUARTERS_NON_ASCII
    } else if ('A'..='z').contains(&c) {
        QUARTERS_LETTER
    } else {
        QUARTERS_OTHER_ASCII
    }
}

/// Estimated token count of `text`. Empty text costs zero.
pub fn estimate_token_length(text: &str) -> u64 {
    let quarters: u64 = text.chars().map(char_quarters).sum();
    quarters.div_ceil(4)
}

/// Estimated token count of a message's text. Images are free.
pub fn estimate_message_tokens(message: &ChatMessage) -> u64 {
    estimate_token_length(&message.text_content())
}

/// Estimated token count of a message list.
pub fn count_messages<'a, I>(messages: I) -> u64
where
    I: IntoIterator<Item = &'a ChatMessage>,
{
    messages.into_iter().map(estimate_message_tokens).sum()
}
