//! Token counting for the embedding model's input budget.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::warn;
use tiktoken_rs::CoreBPE;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;

/// Counts how many model tokens a piece of text costs.
///
/// Implementations must be deterministic and split cleanly at single
/// spaces: the count of `w1 w2 .. wn` equals `count_word(w1)` plus
/// `count_joined_word(wi)` for every later word.
/// [`chunk_text_with`](crate::analysis::chunker::chunk_text_with) relies on
/// this to build chunks in a single pass.
pub trait TokenCounter: Send + Sync {
    /// Token cost of a single whitespace-free word at the start of a text.
    fn count_word(&self, word: &str) -> usize;

    /// Token cost of a word that follows another word and one space.
    fn count_joined_word(&self, word: &str) -> usize {
        self.count_word(word)
    }

    /// Token cost of arbitrary text.
    fn count(&self, text: &str) -> usize {
        let mut words = text.split_whitespace();
        let Some(first) = words.next() else {
            return 0;
        };
        self.count_word(first) + words.map(|w| self.count_joined_word(w)).sum::<usize>()
    }
}

/// Exact counts under a byte-pair-encoding vocabulary of OpenAI models.
///
/// Whitespace is collapsed to single spaces before counting, which is how
/// the chunker rebuilds text. BPE pre-tokenization never merges across a
/// single space except by attaching that space to the following word, so
/// the per-word split above is exact.
pub struct BpeTokenCounter {
    bpe: CoreBPE,
    vocabulary: String,
}

impl fmt::Debug for BpeTokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenCounter")
            .field("vocabulary", &self.vocabulary)
            .finish()
    }
}

impl BpeTokenCounter {
    /// The `cl100k_base` vocabulary used by `text-embedding-ada-002` and the
    /// `text-embedding-3-*` models.
    pub fn cl100k() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
            vocabulary: "cl100k_base".to_string(),
        })
    }

    /// The vocabulary of `model`, as known to `tiktoken`.
    pub fn for_model(model: &str) -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::get_bpe_from_model(model)?,
            vocabulary: model.to_string(),
        })
    }

    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count_word(&self, word: &str) -> usize {
        self.encoded_len(word)
    }

    fn count_joined_word(&self, word: &str) -> usize {
        self.encoded_len(&format!(" {word}"))
    }

    fn count(&self, text: &str) -> usize {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.encoded_len(&collapsed)
    }
}

/// Deterministic approximation of a byte-pair-encoding tokenizer.
///
/// Used when no BPE vocabulary can be loaded. Each word is segmented on
/// Unicode word boundaries. Alphanumeric segments cost one token per
/// `chars_per_token` characters (rounded up); every other character
/// (punctuation, symbols) costs one token.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenCounter {
    chars_per_token: usize,
}

impl HeuristicTokenCounter {
    /// Characters per token for English text under OpenAI's BPE vocabularies.
    pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_word(&self, word: &str) -> usize {
        word.split_word_bounds()
            .map(|segment| {
                if segment.chars().any(char::is_alphanumeric) {
                    segment.chars().count().div_ceil(self.chars_per_token)
                } else {
                    segment.chars().filter(|c| !c.is_whitespace()).count()
                }
            })
            .sum()
    }
}

lazy_static! {
    static ref DEFAULT_COUNTER: Arc<dyn TokenCounter> = match BpeTokenCounter::cl100k() {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            warn!("Could not load cl100k_base ({e}); estimating token counts");
            Arc::new(HeuristicTokenCounter::default())
        }
    };
}

/// The shared `cl100k_base` counter, or the heuristic if it failed to load.
pub fn default_counter() -> Arc<dyn TokenCounter> {
    Arc::clone(&DEFAULT_COUNTER)
}

/// Token count of `text` under the default counter.
pub fn count_tokens(text: &str) -> usize {
    DEFAULT_COUNTER.count(text)
}
