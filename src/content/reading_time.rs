//! Reading-time estimation

use super::{rich_text, ContentBlock};

pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Minutes to read `blocks`, rounded up per block and summed
pub fn estimate(blocks: &[ContentBlock], words_per_minute: usize) -> usize {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };

    blocks
        .iter()
        .map(|block| rich_text::word_count(&rich_text::as_text(&block.body)).div_ceil(wpm))
        .sum()
}
