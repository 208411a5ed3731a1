//! bytemerge - byte-level BPE tokenizer engine for tiktoken vocabularies
//!
//! A tokenizer featuring:
//! - Heap-driven BPE merging (avoids O(N²) on pathological inputs)
//! - fancy-regex pretokenization for the r50k, cl100k and o200k patterns
//! - Aho-Corasick for fast special token matching
//! - Rayon parallelism for batch encoding and decoding
//! - FxHashMap for fast lookups
//! - Optional LRU cache for frequently encoded chunks
//! - Bundled OpenAI vocabularies, byte-for-byte compatible with tiktoken
//!
//! ```rust
//! use bytemerge::Tokenizer;
//!
//! let tokenizer = Tokenizer::from_pretrained("openai/cl100k_base").unwrap();
//! let tokens = tokenizer.encode("Hello, world!");
//! assert_eq!(tokens, vec![9906, 11, 1917, 0]);
//! assert_eq!(tokenizer.decode(&tokens).unwrap(), "Hello, world!");
//! ```

pub mod core;

pub use crate::core::{
    available_models, byte_pair_encode, from_pretrained, pretrained, PatternFamily, Pretokenizer,
    PretrainedModel, Segment, SpecialTokenSplitter, Tokenizer, TokenizerError, VocabError,
    VocabularyStore, CL100K_PATTERN, O200K_PATTERN, R50K_PATTERN,
};
