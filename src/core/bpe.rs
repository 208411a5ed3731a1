//! Byte-pair encoding of a single pretokenized chunk.
//!
//! The chunk starts out as one part per byte. Each adjacent pair of parts whose
//! concatenated bytes form a vocabulary token is a merge candidate, ranked by that
//! token's id. The lowest-ranked candidate is merged (leftmost on equal rank) until
//! no candidate remains.
//!
//! Rather than rescanning every pair after each merge (O(N²) on long chunks), parts
//! are kept in a doubly linked list indexed by their start offset and candidates
//! sit in a min-heap keyed by `(rank, start)`. A merge only changes the two pairs
//! touching the merged part, so stale heap entries are detected on pop and skipped.
//! This yields exactly the merge order of the rescanning algorithm in O(N log N).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::store::VocabularyStore;

const NONE: usize = usize::MAX;

/// `(rank, left, mid, end)`: merge `[left, mid)` with `[mid, end)` into token `rank`.
type Candidate = Reverse<(u32, usize, usize, usize)>;

/// Encode one chunk of bytes into token ids.
///
/// The concatenated bytes of the returned tokens always equal `piece`.
pub fn byte_pair_encode(piece: &[u8], vocab: &VocabularyStore) -> Vec<u32> {
    let n = piece.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![vocab.byte_token(piece[0])];
    }

    // next[i] / prev[i] are only meaningful while part i is alive.
    let mut next: Vec<usize> = (1..=n).collect();
    let mut prev: Vec<usize> = (0..n).map(|i| if i == 0 { NONE } else { i - 1 }).collect();
    let mut alive = vec![true; n];

    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(n);
    for i in 0..n - 1 {
        if let Some(rank) = vocab.span_rank(&piece[i..i + 2]) {
            heap.push(Reverse((rank, i, i + 1, i + 2)));
        }
    }

    while let Some(Reverse((_, left, mid, end))) = heap.pop() {
        if !alive[left] || next[left] != mid || !alive[mid] || next[mid] != end {
            continue;
        }

        alive[mid] = false;
        next[left] = end;
        if end < n {
            prev[end] = left;
        }

        let before = prev[left];
        if before != NONE {
            if let Some(rank) = vocab.span_rank(&piece[before..end]) {
                heap.push(Reverse((rank, before, left, end)));
            }
        }
        if end < n {
            let after = next[end];
            if let Some(rank) = vocab.span_rank(&piece[left..after]) {
                heap.push(Reverse((rank, left, end, after)));
            }
        }
    }

    let mut tokens = Vec::with_capacity(n);
    let mut start = 0;
    while start < n {
        let end = next[start];
        let span = &piece[start..end];
        match vocab.span_rank(span) {
            Some(id) => tokens.push(id),
            None => tokens.extend(span.iter().map(|&b| vocab.byte_token(b))),
        }
        start = end;
    }
    tokens
}
