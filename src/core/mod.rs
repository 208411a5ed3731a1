//! Core tokenization engine for bytemerge.
//!
//! This module contains the byte-level BPE tokenizer implementation with:
//! - Byte-pair encoding using a heap over a linked list of parts (O(N log N) merges)
//! - Vocabulary loading and saving in the tiktoken base64 format
//! - Regex pretokenization for the r50k, cl100k and o200k pattern families
//! - Main tokenizer interface with special-token handling and Rayon batching
//!
//! # Architecture
//!
//! - [`VocabularyStore`]: immutable token tables (bytes <-> id, merge ranks,
//!   special tokens)
//! - [`Pretokenizer`]: splits text into chunks with a [`PatternFamily`] regex
//! - [`SpecialTokenSplitter`]: Aho-Corasick matching of special-token literals
//! - [`byte_pair_encode`]: the merge loop for a single chunk
//! - [`Tokenizer`]: ties the above together, plus decoding, batching and an
//!   optional LRU chunk cache
//! - [`pretrained`]: the bundled OpenAI vocabularies

mod bpe;
pub mod byte_table;
mod pretokenizer;
pub mod pretrained;
mod special;
mod store;
mod tokenizer;
mod vocab;

pub use bpe::byte_pair_encode;
pub use pretokenizer::{
    Chunks, PatternFamily, Pretokenizer, CL100K_PATTERN, O200K_PATTERN, R50K_PATTERN,
};
pub use pretrained::{available_models, from_pretrained, PretrainedModel};
pub use special::{Segment, Segments, SpecialTokenSplitter};
pub use store::VocabularyStore;
pub use tokenizer::{Tokenizer, TokenizerError};
pub use vocab::{
    decode_token, encode_token, load_tiktoken_bpe, load_tiktoken_bpe_file, read_tiktoken_bpe,
    save_tiktoken_bpe_file, write_tiktoken_bpe, VocabEntry, VocabError,
};
