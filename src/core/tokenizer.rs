use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::FxBuildHasher;
use thiserror::Error;

use super::bpe::byte_pair_encode;
use super::pretokenizer::{PatternFamily, Pretokenizer};
use super::special::{Segment, SpecialTokenSplitter};
use super::store::VocabularyStore;
use super::vocab::{
    load_tiktoken_bpe, load_tiktoken_bpe_file, save_tiktoken_bpe_file, write_tiktoken_bpe,
    VocabError,
};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Unknown or empty model name: {0:?}")]
    InvalidModel(String),
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("Unknown token id: {0}")]
    UnknownTokenId(u32),
    #[error("Decoding error: invalid UTF-8")]
    InvalidUtf8,
    #[error("Regex compilation error: {0}")]
    Regex(#[from] Box<fancy_regex::Error>),
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<fancy_regex::Error> for TokenizerError {
    fn from(err: fancy_regex::Error) -> Self {
        TokenizerError::Regex(Box::new(err))
    }
}

type ChunkCache = Mutex<LruCache<Vec<u8>, Vec<u32>, FxBuildHasher>>;

fn new_chunk_cache(cache_size: usize) -> Option<ChunkCache> {
    NonZeroUsize::new(cache_size).map(|cap| Mutex::new(LruCache::with_hasher(cap, FxBuildHasher)))
}

/// Byte-level BPE tokenizer over an immutable vocabulary.
///
/// Encoding runs in three stages: special-token literals are split out (only for
/// the `*_special` entry points), the remaining text is cut into chunks by the
/// model's [`PatternFamily`] regex, and each chunk is byte-pair encoded
/// independently.
///
/// # Performance Characteristics
///
/// - **Single text encoding** is sequential. Chunks are short, so per-chunk
///   parallelism costs more than it saves.
/// - **Batch encoding** parallelizes across texts with Rayon; output order always
///   matches input order.
/// - A chunk that is itself a vocabulary token skips BPE entirely.
/// - An optional LRU cache ([`Tokenizer::with_cache_size`]) memoizes BPE output
///   for repeated chunks. It is off by default, in which case encoding takes no
///   locks at all.
///
/// A `Tokenizer` is `Send + Sync`; share one behind an `Arc` across threads.
pub struct Tokenizer {
    vocab: VocabularyStore,
    family: PatternFamily,
    pretokenizer: Pretokenizer,
    specials: SpecialTokenSplitter,
    chunk_cache: Option<ChunkCache>,
    cache_size: usize,
}

impl Tokenizer {
    /// Create a tokenizer over `vocab`, splitting text with `family`'s pattern.
    pub fn new(vocab: VocabularyStore, family: PatternFamily) -> Result<Self, TokenizerError> {
        Self::with_cache_size(vocab, family, 0)
    }

    /// Create a tokenizer with an LRU chunk cache of `cache_size` entries.
    ///
    /// `0` disables the cache.
    pub fn with_cache_size(
        vocab: VocabularyStore,
        family: PatternFamily,
        cache_size: usize,
    ) -> Result<Self, TokenizerError> {
        let pretokenizer = Pretokenizer::from_family(family)?;
        let specials = SpecialTokenSplitter::new(
            vocab
                .special_tokens()
                .iter()
                .map(|(name, id)| (name.as_str(), *id)),
        )?;

        if cache_size > 0 {
            log::debug!("chunk cache enabled with {} entries", cache_size);
        }

        Ok(Self {
            vocab,
            family,
            pretokenizer,
            specials,
            chunk_cache: new_chunk_cache(cache_size),
            cache_size,
        })
    }

    /// Create a tokenizer from raw vocabulary bytes in the base64 format.
    pub fn from_bytes(
        vocab_data: &[u8],
        family: PatternFamily,
        special_tokens: Vec<(String, u32)>,
    ) -> Result<Self, TokenizerError> {
        let entries = load_tiktoken_bpe(vocab_data)?;
        let vocab = VocabularyStore::new(entries, special_tokens)?;
        Self::new(vocab, family)
    }

    /// Create a tokenizer from a vocabulary file in the base64 format.
    pub fn from_file<P: AsRef<Path>>(
        vocab_path: P,
        family: PatternFamily,
        special_tokens: Vec<(String, u32)>,
    ) -> Result<Self, TokenizerError> {
        let entries = load_tiktoken_bpe_file(vocab_path)?;
        let vocab = VocabularyStore::new(entries, special_tokens)?;
        Self::new(vocab, family)
    }

    /// Load a bundled model by name, e.g. `"cl100k_base"` or `"openai/o200k_base"`.
    ///
    /// See [`crate::pretrained`] for the list of models.
    pub fn from_pretrained(name: &str) -> Result<Self, TokenizerError> {
        super::pretrained::from_pretrained(name)
    }

    /// Qualified names of every bundled model.
    pub fn available_models() -> Vec<&'static str> {
        super::pretrained::available_models()
    }

    /// BPE one chunk into `out`, via the whole-token fast path or the cache.
    fn encode_chunk_into(&self, chunk: &[u8], out: &mut Vec<u32>) {
        if let Some(id) = self.vocab.span_rank(chunk) {
            out.push(id);
            return;
        }

        let Some(cache) = &self.chunk_cache else {
            out.extend(byte_pair_encode(chunk, &self.vocab));
            return;
        };

        if let Ok(mut cache) = cache.lock() {
            if let Some(cached) = cache.get(chunk) {
                out.extend_from_slice(cached);
                return;
            }
        }

        let tokens = byte_pair_encode(chunk, &self.vocab);
        out.extend_from_slice(&tokens);

        if let Ok(mut cache) = cache.lock() {
            cache.put(chunk.to_vec(), tokens);
        }
    }

    fn encode_ordinary_into(&self, text: &str, out: &mut Vec<u32>) {
        let bytes = text.as_bytes();
        for range in self.pretokenizer.chunks(text) {
            self.encode_chunk_into(&bytes[range], out);
        }
    }

    fn encode_with_splitter(&self, splitter: &SpecialTokenSplitter, text: &str) -> Vec<u32> {
        let mut tokens = Vec::with_capacity(text.len() / 3);
        for segment in splitter.split(text) {
            match segment {
                Segment::Ordinary(piece) => self.encode_ordinary_into(piece, &mut tokens),
                Segment::Special(id) => tokens.push(id),
            }
        }
        tokens
    }

    /// Build a splitter recognizing only the named special tokens.
    ///
    /// Names that are not special tokens of this vocabulary are ignored.
    fn allowed_splitter(&self, allowed: &[&str]) -> Result<SpecialTokenSplitter, TokenizerError> {
        SpecialTokenSplitter::new(
            self.vocab
                .special_tokens()
                .iter()
                .filter(|(name, _)| allowed.contains(&name.as_str()))
                .map(|(name, id)| (name.as_str(), *id)),
        )
    }

    /// Encode text to token ids. Special-token literals are encoded as plain text.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut tokens = Vec::with_capacity(text.len() / 3);
        self.encode_ordinary_into(text, &mut tokens);
        tokens
    }

    /// Encode text, mapping every configured special-token literal to its id.
    pub fn encode_with_special(&self, text: &str) -> Vec<u32> {
        if self.specials.is_empty() {
            return self.encode(text);
        }
        self.encode_with_splitter(&self.specials, text)
    }

    /// Encode text, mapping only the `allowed` special-token literals to their ids.
    ///
    /// Other special literals are encoded as plain text.
    pub fn encode_with_allowed_special(
        &self,
        text: &str,
        allowed: &[&str],
    ) -> Result<Vec<u32>, TokenizerError> {
        let splitter = self.allowed_splitter(allowed)?;
        Ok(self.encode_with_splitter(&splitter, text))
    }

    /// Decode token ids to raw bytes.
    ///
    /// Special-token ids decode to their literal text.
    pub fn decode_bytes(&self, tokens: &[u32]) -> Result<Vec<u8>, TokenizerError> {
        let mut result = Vec::with_capacity(tokens.len() * 4);
        for &token in tokens {
            let bytes = self
                .vocab
                .id_to_token(token)
                .ok_or(TokenizerError::UnknownTokenId(token))?;
            result.extend_from_slice(bytes);
        }
        Ok(result)
    }

    /// Decode token ids to a string.
    ///
    /// # Errors
    /// [`TokenizerError::UnknownTokenId`] for an id outside the vocabulary,
    /// [`TokenizerError::InvalidUtf8`] if the tokens do not form valid UTF-8 (for
    /// instance a multi-byte character cut in half).
    pub fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        String::from_utf8(bytes).map_err(|_| TokenizerError::InvalidUtf8)
    }

    /// Decode token ids to a string, replacing invalid UTF-8 with U+FFFD.
    ///
    /// Unknown ids are still an error.
    pub fn decode_lossy(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Vec<u32>> {
        texts.par_iter().map(|text| self.encode(text.as_ref())).collect()
    }

    /// Batch encode multiple texts with special token handling.
    pub fn encode_batch_with_special<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Vec<u32>> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text.as_ref()))
            .collect()
    }

    /// Batch encode multiple texts, recognizing only the `allowed` special tokens.
    pub fn encode_batch_with_allowed_special<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
        allowed: &[&str],
    ) -> Result<Vec<Vec<u32>>, TokenizerError> {
        let splitter = self.allowed_splitter(allowed)?;
        Ok(texts
            .par_iter()
            .map(|text| self.encode_with_splitter(&splitter, text.as_ref()))
            .collect())
    }

    /// Batch decode multiple token lists in parallel.
    ///
    /// Fails as a whole if any list fails to decode.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Batch decode multiple token lists in parallel, replacing invalid UTF-8.
    pub fn decode_batch_lossy(
        &self,
        token_lists: &[Vec<u32>],
    ) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode_lossy(tokens))
            .collect()
    }

    /// Batch decode multiple token lists to raw bytes in parallel.
    pub fn decode_batch_bytes(
        &self,
        token_lists: &[Vec<u32>],
    ) -> Result<Vec<Vec<u8>>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode_bytes(tokens))
            .collect()
    }

    /// Number of ordinary tokens; special tokens are not counted.
    pub fn vocab_size(&self) -> usize {
        self.vocab.vocab_size()
    }

    /// Largest token id, special tokens included.
    pub fn max_token(&self) -> u32 {
        self.vocab.max_token_id()
    }

    /// Id of the ordinary token with exactly these bytes.
    pub fn token_to_id<T: AsRef<[u8]>>(&self, token: T) -> Option<u32> {
        self.vocab.token_to_id(token.as_ref())
    }

    /// Bytes of an ordinary or special token.
    pub fn id_to_token(&self, id: u32) -> Option<&[u8]> {
        self.vocab.id_to_token(id)
    }

    /// Special tokens as `(literal, id)` pairs, in configuration order.
    pub fn get_special_tokens(&self) -> &[(String, u32)] {
        self.vocab.special_tokens()
    }

    pub fn special_token_id(&self, name: &str) -> Option<u32> {
        self.vocab.special_token_id(name)
    }

    pub fn family(&self) -> PatternFamily {
        self.family
    }

    pub fn vocab(&self) -> &VocabularyStore {
        &self.vocab
    }

    /// Write the merge-derived vocabulary to `path` in the base64 format.
    ///
    /// Single-byte tokens and special tokens are left out; [`Tokenizer::from_file`]
    /// restores the byte tokens on load. Returns the number of lines written.
    pub fn save_base64_vocab<P: AsRef<Path>>(&self, path: P) -> Result<usize, TokenizerError> {
        Ok(save_tiktoken_bpe_file(self.vocab.merge_entries(), path)?)
    }

    /// Like [`save_base64_vocab`](Self::save_base64_vocab), to any writer.
    pub fn write_base64_vocab<W: Write>(&self, writer: &mut W) -> Result<usize, TokenizerError> {
        Ok(write_tiktoken_bpe(self.vocab.merge_entries(), writer)?)
    }

    /// Clear the encoding cache.
    pub fn clear_cache(&self) {
        if let Some(Ok(mut cache)) = self.chunk_cache.as_ref().map(Mutex::lock) {
            cache.clear();
        }
    }

    /// Number of chunks currently cached.
    pub fn cache_len(&self) -> usize {
        self.chunk_cache
            .as_ref()
            .and_then(|cache| cache.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        // Caches are not shared between clones.
        Self {
            vocab: self.vocab.clone(),
            family: self.family,
            pretokenizer: self.pretokenizer.clone(),
            specials: self.specials.clone(),
            chunk_cache: new_chunk_cache(self.cache_size),
            cache_size: self.cache_size,
        }
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("family", &self.family)
            .field("vocab_size", &self.vocab.vocab_size())
            .field("special_tokens", &self.vocab.special_tokens().len())
            .field("cache_size", &self.cache_size)
            .finish()
    }
}
