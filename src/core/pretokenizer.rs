//! Regex pretokenization: splitting text into the chunks BPE runs on.
//!
//! Merges never cross a chunk boundary, so the split pattern is as much a part
//! of a model as its vocabulary. The three OpenAI pattern families are provided
//! as [`PatternFamily`]; arbitrary patterns go through [`Pretokenizer::new`].

use std::fmt;
use std::ops::Range;

use fancy_regex::{Matches, Regex};

use super::tokenizer::TokenizerError;

/// Split pattern for r50k_base, p50k_base and p50k_edit (GPT-2, GPT-3).
pub const R50K_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Split pattern for cl100k_base (GPT-4, GPT-3.5-turbo).
pub const CL100K_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Split pattern for o200k_base and o200k_harmony (GPT-4o and later).
///
/// Letter runs are case-aware so `HelloWorld` splits into `Hello` and `World`,
/// and a contraction suffix stays attached to the word before it.
pub const O200K_PATTERN: &str = concat!(
    r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|\p{N}{1,3}",
    r"| ?[^\s\p{L}\p{N}]+[\r\n/]*",
    r"|\s*[\r\n]+",
    r"|\s+(?!\S)",
    r"|\s+",
);

/// The pretokenization pattern a model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFamily {
    R50k,
    Cl100k,
    O200k,
}

impl PatternFamily {
    pub fn pattern(self) -> &'static str {
        match self {
            PatternFamily::R50k => R50K_PATTERN,
            PatternFamily::Cl100k => CL100K_PATTERN,
            PatternFamily::O200k => O200K_PATTERN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PatternFamily::R50k => "r50k",
            PatternFamily::Cl100k => "cl100k",
            PatternFamily::O200k => "o200k",
        }
    }

    /// Look up a family by its short name or by the name of a model that uses it.
    ///
    /// ```
    /// use bytemerge::PatternFamily;
    ///
    /// assert_eq!(PatternFamily::from_name("cl100k"), Some(PatternFamily::Cl100k));
    /// assert_eq!(PatternFamily::from_name("p50k_edit"), Some(PatternFamily::R50k));
    /// assert_eq!(PatternFamily::from_name("llama3"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "r50k" | "r50k_base" | "p50k_base" | "p50k_edit" | "gpt2" => Some(PatternFamily::R50k),
            "cl100k" | "cl100k_base" => Some(PatternFamily::Cl100k),
            "o200k" | "o200k_base" | "o200k_harmony" => Some(PatternFamily::O200k),
            _ => None,
        }
    }
}

impl fmt::Display for PatternFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled split pattern.
#[derive(Debug, Clone)]
pub struct Pretokenizer {
    regex: Regex,
}

impl Pretokenizer {
    /// Compile a custom split pattern.
    pub fn new(pattern: &str) -> Result<Self, TokenizerError> {
        let regex = Regex::new(pattern)?;
        Ok(Self { regex })
    }

    pub fn from_family(family: PatternFamily) -> Result<Self, TokenizerError> {
        Self::new(family.pattern())
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Byte ranges of the chunks of `text`, in order.
    ///
    /// The ranges tile `text` exactly: text the pattern skips over comes back as a
    /// chunk of its own, and if the regex engine gives up mid-text (backtrack
    /// limit) the unscanned remainder is yielded as one final chunk. The iterator
    /// is lazy; calling `chunks` again starts over.
    pub fn chunks<'r, 't>(&'r self, text: &'t str) -> Chunks<'r, 't> {
        Chunks {
            matches: self.regex.find_iter(text),
            text_len: text.len(),
            pos: 0,
            pending: None,
            exhausted: false,
        }
    }

    /// Chunks of `text` as string slices.
    pub fn split<'r, 't>(&'r self, text: &'t str) -> impl Iterator<Item = &'t str> + 'r
    where
        't: 'r,
    {
        self.chunks(text).map(move |range| &text[range])
    }
}

/// Iterator returned by [`Pretokenizer::chunks`].
pub struct Chunks<'r, 't> {
    matches: Matches<'r, 't>,
    text_len: usize,
    pos: usize,
    pending: Option<Range<usize>>,
    exhausted: bool,
}

impl Iterator for Chunks<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if let Some(range) = self.pending.take() {
            return Some(range);
        }

        while !self.exhausted {
            match self.matches.next() {
                Some(Ok(m)) => {
                    if m.start() == m.end() {
                        continue;
                    }
                    let gap = self.pos..m.start();
                    self.pos = m.end();
                    if gap.is_empty() {
                        return Some(m.range());
                    }
                    self.pending = Some(m.range());
                    return Some(gap);
                }
                Some(Err(err)) => {
                    log::warn!(
                        "pretokenizer stopped at byte {} of {}: {}",
                        self.pos,
                        self.text_len,
                        err
                    );
                    self.exhausted = true;
                }
                None => self.exhausted = true,
            }
        }

        if self.pos < self.text_len {
            let rest = self.pos..self.text_len;
            self.pos = self.text_len;
            return Some(rest);
        }
        None
    }
}
