//! The immutable vocabulary: byte tokens, merge-derived tokens and special tokens.

use rustc_hash::FxHashMap;

use super::byte_table::{byte_rank, BYTE_TOKEN_COUNT};
use super::vocab::{VocabEntry, VocabError};

/// Bidirectional token table with merge-rank lookup.
///
/// Ordinary tokens (the 256 single-byte fallbacks plus every merge-derived token)
/// are keyed by their bytes; their id doubles as their merge rank. Special tokens
/// live in a separate, insertion-ordered table and are never produced by merging.
///
/// A store is built once and never mutated, so it can be shared freely between
/// threads.
#[derive(Debug, Clone)]
pub struct VocabularyStore {
    encoder: FxHashMap<Vec<u8>, u32>,
    decoder: FxHashMap<u32, Vec<u8>>,
    byte_tokens: [u32; BYTE_TOKEN_COUNT],
    special_tokens: Vec<(String, u32)>,
    special_encoder: FxHashMap<String, u32>,
    special_decoder: FxHashMap<u32, String>,
    max_token_id: u32,
}

impl VocabularyStore {
    /// Build a store from parsed vocabulary entries and special tokens.
    ///
    /// Single bytes absent from `entries` get their canonical id from
    /// [`byte_table`](super::byte_table), which lets a file written by
    /// [`merge_entries`](Self::merge_entries) load back unchanged.
    ///
    /// # Errors
    /// - [`VocabError::DuplicateRank`] if two entries share a rank, or a special
    ///   token id collides with an ordinary id or another special token.
    /// - [`VocabError::DuplicateToken`] if two entries share the same bytes.
    /// - [`VocabError::InvalidEntry`] if an entry or special literal is empty, or a
    ///   missing byte token cannot take its canonical id.
    pub fn new(
        entries: Vec<VocabEntry>,
        special_tokens: Vec<(String, u32)>,
    ) -> Result<Self, VocabError> {
        let mut encoder = FxHashMap::default();
        let mut decoder = FxHashMap::default();
        encoder.reserve(entries.len() + BYTE_TOKEN_COUNT);
        decoder.reserve(entries.len() + BYTE_TOKEN_COUNT);

        for (bytes, rank) in entries {
            if bytes.is_empty() {
                return Err(VocabError::InvalidEntry {
                    id: rank,
                    reason: "empty token".to_string(),
                });
            }
            if decoder.contains_key(&rank) {
                return Err(VocabError::DuplicateRank(rank));
            }
            if encoder.contains_key(&bytes) {
                return Err(VocabError::DuplicateToken { rank });
            }
            decoder.insert(rank, bytes.clone());
            encoder.insert(bytes, rank);
        }

        let mut byte_tokens = [0u32; BYTE_TOKEN_COUNT];
        let mut filled = 0usize;
        for b in 0u8..=255 {
            let existing = encoder.get(&[b][..]).copied();
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = byte_rank(b);
                    if decoder.contains_key(&id) {
                        return Err(VocabError::InvalidEntry {
                            id,
                            reason: format!(
                                "no token for byte 0x{:02x} and its fallback id is taken",
                                b
                            ),
                        });
                    }
                    encoder.insert(vec![b], id);
                    decoder.insert(id, vec![b]);
                    filled += 1;
                    id
                }
            };
            byte_tokens[b as usize] = id;
        }

        let mut special_encoder = FxHashMap::default();
        let mut special_decoder = FxHashMap::default();
        for (name, id) in &special_tokens {
            if name.is_empty() {
                return Err(VocabError::InvalidEntry {
                    id: *id,
                    reason: "empty special token literal".to_string(),
                });
            }
            if decoder.contains_key(id) || special_decoder.contains_key(id) {
                return Err(VocabError::DuplicateRank(*id));
            }
            if special_encoder.contains_key(name) {
                return Err(VocabError::DuplicateToken { rank: *id });
            }
            special_encoder.insert(name.clone(), *id);
            special_decoder.insert(*id, name.clone());
        }

        let max_ordinary = decoder.keys().max().copied().unwrap_or(0);
        let max_special = special_decoder.keys().max().copied().unwrap_or(0);

        log::debug!(
            "built vocabulary: {} ordinary tokens ({} byte tokens filled), {} special tokens",
            decoder.len(),
            filled,
            special_tokens.len()
        );

        Ok(Self {
            encoder,
            decoder,
            byte_tokens,
            special_tokens,
            special_encoder,
            special_decoder,
            max_token_id: max_ordinary.max(max_special),
        })
    }

    /// Number of ordinary tokens (byte tokens plus merge-derived tokens).
    ///
    /// Special tokens are not counted; `cl100k_base` reports 100256.
    pub fn vocab_size(&self) -> usize {
        self.decoder.len()
    }

    /// Largest id in the vocabulary, special tokens included.
    pub fn max_token_id(&self) -> u32 {
        self.max_token_id
    }

    /// Id of an ordinary token with exactly these bytes.
    #[inline]
    pub fn token_to_id(&self, bytes: &[u8]) -> Option<u32> {
        self.encoder.get(bytes).copied()
    }

    /// Bytes of an ordinary or special token.
    #[inline]
    pub fn id_to_token(&self, id: u32) -> Option<&[u8]> {
        self.decoder
            .get(&id)
            .map(Vec::as_slice)
            .or_else(|| self.special_decoder.get(&id).map(String::as_bytes))
    }

    /// Id of the single-byte token for `byte`.
    #[inline]
    pub fn byte_token(&self, byte: u8) -> u32 {
        self.byte_tokens[byte as usize]
    }

    /// Merge rank of a byte span: the id of the ordinary token with these bytes.
    #[inline]
    pub fn span_rank(&self, span: &[u8]) -> Option<u32> {
        self.encoder.get(span).copied()
    }

    /// Priority of merging two adjacent tokens, if their concatenation is a token.
    pub fn merge_rank(&self, left: u32, right: u32) -> Option<u32> {
        let left = self.decoder.get(&left)?;
        let right = self.decoder.get(&right)?;

        let mut joined = Vec::with_capacity(left.len() + right.len());
        joined.extend_from_slice(left);
        joined.extend_from_slice(right);
        self.span_rank(&joined)
    }

    /// Special tokens in insertion order.
    pub fn special_tokens(&self) -> &[(String, u32)] {
        &self.special_tokens
    }

    /// Id of a special token by its literal.
    pub fn special_token_id(&self, name: &str) -> Option<u32> {
        self.special_encoder.get(name).copied()
    }

    /// Literal of a special token by id.
    pub fn special_token_name(&self, id: u32) -> Option<&str> {
        self.special_decoder.get(&id).map(String::as_str)
    }

    pub fn is_special(&self, id: u32) -> bool {
        self.special_decoder.contains_key(&id)
    }

    /// Merge-derived tokens (everything longer than one byte), sorted by rank.
    pub fn merge_entries(&self) -> Vec<(&[u8], u32)> {
        let mut entries: Vec<(&[u8], u32)> = self
            .decoder
            .iter()
            .filter(|(_, bytes)| bytes.len() > 1)
            .map(|(&id, bytes)| (bytes.as_slice(), id))
            .collect();
        entries.sort_unstable_by_key(|&(_, id)| id);
        entries
    }
}
