//! Canonical ordering of the 256 single-byte fallback tokens.
//!
//! Every OpenAI byte-level vocabulary (r50k, p50k, cl100k, o200k) assigns the first
//! 256 ranks to single bytes, in the same order GPT-2 used for its printable byte
//! alphabet:
//!
//! - Bytes 33-126 (`!` to `~`)
//! - Bytes 161-172 (`¡` to `¬`)
//! - Bytes 174-255 (`®` to `ÿ`)
//! - The remaining bytes (0-32, 127-160, 173) in ascending order
//!
//! So `!` is token 0, `~` is token 93 and the space byte is token 220.
//!
//! The vocabulary loader uses this table to fill in byte tokens that a serialized
//! vocabulary omits (see [`crate::core::VocabularyStore`]).

use std::sync::LazyLock;

/// Number of single-byte fallback tokens.
pub const BYTE_TOKEN_COUNT: usize = 256;

/// Rank (and id) of each byte value in the canonical ordering.
static BYTE_TO_RANK: LazyLock<[u32; BYTE_TOKEN_COUNT]> = LazyLock::new(|| {
    let mut ranks = [0u32; BYTE_TOKEN_COUNT];
    for (rank, &byte) in RANK_TO_BYTE.iter().enumerate() {
        ranks[byte as usize] = rank as u32;
    }
    ranks
});

/// Byte value stored at each rank in the canonical ordering.
static RANK_TO_BYTE: LazyLock<[u8; BYTE_TOKEN_COUNT]> = LazyLock::new(|| {
    let mut order = [0u8; BYTE_TOKEN_COUNT];
    let mut next = 0;

    let printable = (33u8..=126).chain(161u8..=172).chain(174u8..=255);
    for b in printable {
        order[next] = b;
        next += 1;
    }
    for b in 0u8..=255 {
        if !is_printable(b) {
            order[next] = b;
            next += 1;
        }
    }

    order
});

#[inline]
fn is_printable(b: u8) -> bool {
    matches!(b, 33..=126 | 161..=172 | 174..=255)
}

/// Canonical fallback id for a single byte.
#[inline]
pub fn byte_rank(byte: u8) -> u32 {
    BYTE_TO_RANK[byte as usize]
}

/// Byte for a canonical fallback id, or `None` if `rank >= 256`.
#[inline]
pub fn rank_byte(rank: u32) -> Option<u8> {
    RANK_TO_BYTE.get(rank as usize).copied()
}
