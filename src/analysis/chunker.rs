//! Token-bounded text chunking.

use crate::analysis::token::{TokenCounter, default_counter};

/// Split `text` into the fewest whitespace-delimited word groups whose token
/// count is at most `max_tokens`, using the default counter.
///
/// See [`chunk_text_with`].
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    chunk_text_with(default_counter().as_ref(), text, max_tokens)
}

/// Split `text` into token-bounded chunks under `counter`.
///
/// - Words are taken in order and packed greedily. A word opening a chunk
///   costs [`TokenCounter::count_word`], later ones
///   [`TokenCounter::count_joined_word`], so each chunk's running total is its
///   exact token count.
/// - A word that alone exceeds `max_tokens` becomes its own chunk and is not
///   split further.
/// - Joining the chunks with single spaces gives back `text` with runs of
///   whitespace collapsed and the ends trimmed.
/// - Empty or all-whitespace input yields no chunks.
pub fn chunk_text_with(counter: &dyn TokenCounter, text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for word in text.split_whitespace() {
        if !current.is_empty() {
            let joined_tokens = counter.count_joined_word(word);
            if current_tokens + joined_tokens <= max_tokens {
                current.push(word);
                current_tokens += joined_tokens;
                continue;
            }
            chunks.push(current.join(" "));
            current.clear();
        }
        current.push(word);
        current_tokens = counter.count_word(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
