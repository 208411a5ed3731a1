//! Finding special-token literals in text before it reaches the pretokenizer.

use aho_corasick::{AhoCorasick, FindIter, MatchKind};

use super::tokenizer::TokenizerError;

/// A piece of input text after special-token splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Text to pretokenize and byte-pair encode. Never empty.
    Ordinary(&'t str),
    /// A recognized special token, by id.
    Special(u32),
}

/// Multi-pattern matcher over a set of special-token literals.
///
/// Overlapping literals resolve leftmost-longest, so with both `<|a|>` and
/// `<|a|>b` configured the text `<|a|>b` yields the longer one.
#[derive(Debug, Clone)]
pub struct SpecialTokenSplitter {
    matcher: AhoCorasick,
    ids: Vec<u32>,
}

impl SpecialTokenSplitter {
    pub fn new<'a, I>(tokens: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let (literals, ids): (Vec<&str>, Vec<u32>) = tokens.into_iter().unzip();
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&literals)?;
        Ok(Self { matcher, ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Split `text` into ordinary and special segments, in order.
    pub fn split<'s, 't>(&'s self, text: &'t str) -> Segments<'s, 't> {
        Segments {
            text,
            matches: self.matcher.find_iter(text),
            ids: &self.ids,
            pos: 0,
            pending: None,
        }
    }
}

/// Iterator returned by [`SpecialTokenSplitter::split`].
pub struct Segments<'s, 't> {
    text: &'t str,
    matches: FindIter<'s, 't>,
    ids: &'s [u32],
    pos: usize,
    pending: Option<u32>,
}

impl<'t> Iterator for Segments<'_, 't> {
    type Item = Segment<'t>;

    fn next(&mut self) -> Option<Segment<'t>> {
        if let Some(id) = self.pending.take() {
            return Some(Segment::Special(id));
        }

        if let Some(m) = self.matches.next() {
            let id = self.ids[m.pattern().as_usize()];
            let before = &self.text[self.pos..m.start()];
            self.pos = m.end();
            if before.is_empty() {
                return Some(Segment::Special(id));
            }
            self.pending = Some(id);
            return Some(Segment::Ordinary(before));
        }

        if self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            self.pos = self.text.len();
            return Some(Segment::Ordinary(rest));
        }
        None
    }
}
