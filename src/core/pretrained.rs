//! Bundled OpenAI vocabularies.
//!
//! This module provides ready-to-use tokenizers for the OpenAI byte-level BPE
//! encodings:
//! - `r50k_base` - GPT-2, GPT-3 (~50k tokens)
//! - `p50k_base` - Codex, text-davinci-002/003 (~50k tokens)
//! - `p50k_edit` - `p50k_base` with fill-in-the-middle special tokens
//! - `cl100k_base` - GPT-4, GPT-3.5-turbo (~100k tokens)
//! - `o200k_base` - GPT-4o (~200k tokens)
//! - `o200k_harmony` - `o200k_base` with the chat-format special tokens
//!
//! Each name is also accepted with an `openai/` prefix.
//!
//! # Example
//!
//! ```rust
//! use bytemerge::pretrained::from_pretrained;
//!
//! let tokenizer = from_pretrained("cl100k_base").unwrap();
//! let tokens = tokenizer.encode("hello world");
//! assert_eq!(tokens, vec![15339, 1917]);
//! ```

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::pretokenizer::PatternFamily;
use super::store::VocabularyStore;
use super::tokenizer::{Tokenizer, TokenizerError};
use super::vocab::load_tiktoken_bpe;

// Embed vocabulary files at compile time
pub const R50K_BASE_VOCAB: &[u8] = include_bytes!("../../vocabs/r50k_base.tiktoken");
pub const P50K_BASE_VOCAB: &[u8] = include_bytes!("../../vocabs/p50k_base.tiktoken");
pub const CL100K_BASE_VOCAB: &[u8] = include_bytes!("../../vocabs/cl100k_base.tiktoken");
pub const O200K_BASE_VOCAB: &[u8] = include_bytes!("../../vocabs/o200k_base.tiktoken");

pub const ENDOFTEXT: &str = "<|endoftext|>";
pub const STARTOFTEXT: &str = "<|startoftext|>";
pub const ENDOFPROMPT: &str = "<|endofprompt|>";
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";

/// Supported pretrained models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PretrainedModel {
    /// GPT-2 / GPT-3
    R50kBase,
    /// Codex, text-davinci-002/003
    P50kBase,
    /// `p50k_base` with FIM tokens
    P50kEdit,
    /// GPT-4, GPT-3.5-turbo
    Cl100kBase,
    /// GPT-4o
    O200kBase,
    /// `o200k_base` with chat-format and reserved tokens
    O200kHarmony,
}

static MODELS: LazyLock<FxHashMap<&'static str, PretrainedModel>> = LazyLock::new(|| {
    let mut models = FxHashMap::default();
    for model in PretrainedModel::ALL {
        models.insert(model.name(), model);
        models.insert(model.qualified_name(), model);
    }
    models
});

impl PretrainedModel {
    pub const ALL: [PretrainedModel; 6] = [
        PretrainedModel::R50kBase,
        PretrainedModel::P50kBase,
        PretrainedModel::P50kEdit,
        PretrainedModel::Cl100kBase,
        PretrainedModel::O200kBase,
        PretrainedModel::O200kHarmony,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PretrainedModel::R50kBase => "r50k_base",
            PretrainedModel::P50kBase => "p50k_base",
            PretrainedModel::P50kEdit => "p50k_edit",
            PretrainedModel::Cl100kBase => "cl100k_base",
            PretrainedModel::O200kBase => "o200k_base",
            PretrainedModel::O200kHarmony => "o200k_harmony",
        }
    }

    pub fn qualified_name(self) -> &'static str {
        match self {
            PretrainedModel::R50kBase => "openai/r50k_base",
            PretrainedModel::P50kBase => "openai/p50k_base",
            PretrainedModel::P50kEdit => "openai/p50k_edit",
            PretrainedModel::Cl100kBase => "openai/cl100k_base",
            PretrainedModel::O200kBase => "openai/o200k_base",
            PretrainedModel::O200kHarmony => "openai/o200k_harmony",
        }
    }

    /// Parse a model name, bare (`cl100k_base`) or qualified (`openai/cl100k_base`).
    pub fn from_name(name: &str) -> Option<Self> {
        MODELS.get(name).copied()
    }

    /// Raw vocabulary file contents.
    pub fn vocab_data(self) -> &'static [u8] {
        match self {
            PretrainedModel::R50kBase => R50K_BASE_VOCAB,
            PretrainedModel::P50kBase | PretrainedModel::P50kEdit => P50K_BASE_VOCAB,
            PretrainedModel::Cl100kBase => CL100K_BASE_VOCAB,
            PretrainedModel::O200kBase | PretrainedModel::O200kHarmony => O200K_BASE_VOCAB,
        }
    }

    pub fn family(self) -> PatternFamily {
        match self {
            PretrainedModel::R50kBase | PretrainedModel::P50kBase | PretrainedModel::P50kEdit => {
                PatternFamily::R50k
            }
            PretrainedModel::Cl100kBase => PatternFamily::Cl100k,
            PretrainedModel::O200kBase | PretrainedModel::O200kHarmony => PatternFamily::O200k,
        }
    }

    pub fn special_tokens(self) -> Vec<(String, u32)> {
        match self {
            PretrainedModel::R50kBase | PretrainedModel::P50kBase => r50k_special_tokens(),
            PretrainedModel::P50kEdit => p50k_edit_special_tokens(),
            PretrainedModel::Cl100kBase => cl100k_base_special_tokens(),
            PretrainedModel::O200kBase => o200k_base_special_tokens(),
            PretrainedModel::O200kHarmony => o200k_harmony_special_tokens(),
        }
    }

    /// Parse the embedded vocabulary and build a tokenizer.
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn load(self) -> Result<Tokenizer, TokenizerError> {
        let entries = load_tiktoken_bpe(self.vocab_data())?;
        let vocab = VocabularyStore::new(entries, self.special_tokens())?;
        let tokenizer = Tokenizer::new(vocab, self.family())?;

        log::info!(
            "loaded {}: {} tokens, {} special tokens, {} pattern",
            self.qualified_name(),
            tokenizer.vocab_size(),
            tokenizer.get_special_tokens().len(),
            self.family()
        );
        Ok(tokenizer)
    }
}

/// Create a pretrained tokenizer by model name.
///
/// # Supported Names
/// `r50k_base`, `p50k_base`, `p50k_edit`, `cl100k_base`, `o200k_base`,
/// `o200k_harmony`, each optionally prefixed with `openai/`.
///
/// # Errors
/// [`TokenizerError::InvalidModel`] for an empty or unknown name.
pub fn from_pretrained(name: &str) -> Result<Tokenizer, TokenizerError> {
    let model = PretrainedModel::from_name(name).ok_or_else(|| {
        TokenizerError::InvalidModel(if name.is_empty() {
            String::new()
        } else {
            format!("{}. Supported: {}", name, available_models().join(", "))
        })
    })?;

    model.load()
}

/// Qualified names of every bundled model, e.g. `openai/cl100k_base`.
pub fn available_models() -> Vec<&'static str> {
    PretrainedModel::ALL
        .iter()
        .map(|model| model.qualified_name())
        .collect()
}

fn owned(tokens: &[(&str, u32)]) -> Vec<(String, u32)> {
    tokens
        .iter()
        .map(|&(name, id)| (name.to_string(), id))
        .collect()
}

/// Special tokens of `r50k_base` and `p50k_base`.
pub fn r50k_special_tokens() -> Vec<(String, u32)> {
    owned(&[(ENDOFTEXT, 50256)])
}

pub fn p50k_edit_special_tokens() -> Vec<(String, u32)> {
    owned(&[
        (ENDOFTEXT, 50256),
        (FIM_PREFIX, 50281),
        (FIM_MIDDLE, 50282),
        (FIM_SUFFIX, 50283),
    ])
}

pub fn cl100k_base_special_tokens() -> Vec<(String, u32)> {
    owned(&[
        (ENDOFTEXT, 100257),
        (FIM_PREFIX, 100258),
        (FIM_MIDDLE, 100259),
        (FIM_SUFFIX, 100260),
        (ENDOFPROMPT, 100276),
    ])
}

pub fn o200k_base_special_tokens() -> Vec<(String, u32)> {
    owned(&[(ENDOFTEXT, 199999), (ENDOFPROMPT, 200018)])
}

/// Special tokens of `o200k_harmony`: the named chat-format tokens, then every
/// unnamed id from 200000 up to 201087 as `<|reserved_N|>`.
pub fn o200k_harmony_special_tokens() -> Vec<(String, u32)> {
    let mut special = owned(&[
        (STARTOFTEXT, 199998),
        (ENDOFTEXT, 199999),
        (ENDOFPROMPT, 200018),
        ("<|return|>", 200002),
        ("<|constrain|>", 200003),
        ("<|channel|>", 200005),
        ("<|start|>", 200006),
        ("<|end|>", 200007),
        ("<|message|>", 200008),
        ("<|call|>", 200012),
    ]);

    // 200018 is <|endofprompt|>, inside the reserved range
    let named: Vec<u32> = special.iter().map(|&(_, id)| id).collect();
    let reserved = [200000, 200001, 200004, 200009, 200010, 200011]
        .into_iter()
        .chain(200013..201088)
        .filter(|id| !named.contains(id));
    special.extend(reserved.map(|id| (format!("<|reserved_{}|>", id), id)));
    special
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALIFIER: &str = "openai/";

    #[test]
    fn test_model_from_name() {
        assert_eq!(
            PretrainedModel::from_name("cl100k_base"),
            Some(PretrainedModel::Cl100kBase)
        );
        assert_eq!(
            PretrainedModel::from_name("openai/o200k_harmony"),
            Some(PretrainedModel::O200kHarmony)
        );
        assert_eq!(PretrainedModel::from_name("gpt2"), None);
        assert_eq!(PretrainedModel::from_name("openai/"), None);
        assert_eq!(PretrainedModel::from_name(""), None);
    }

    #[test]
    fn test_names_roundtrip() {
        for model in PretrainedModel::ALL {
            assert_eq!(PretrainedModel::from_name(model.name()), Some(model));
            assert_eq!(
                model.qualified_name(),
                format!("{}{}", QUALIFIER, model.name())
            );
        }
    }

    #[test]
    fn test_available_models() {
        let models = available_models();
        assert_eq!(models.len(), 6);
        assert!(models.iter().all(|m| m.starts_with(QUALIFIER)));
        assert!(models.contains(&"openai/cl100k_base"));
    }

    #[test]
    fn test_invalid_model() {
        for name in ["", "llama3", "openai/cl100k", "CL100K_BASE"] {
            let err = from_pretrained(name).unwrap_err();
            assert!(
                matches!(err, TokenizerError::InvalidModel(_)),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_every_model_loads() {
        for model in PretrainedModel::ALL {
            for name in [model.name(), model.qualified_name()] {
                let tokenizer = from_pretrained(name)
                    .unwrap_or_else(|e| panic!("{} failed to load: {}", name, e));
                assert_eq!(tokenizer.family(), model.family());
                assert_eq!(
                    tokenizer.get_special_tokens().len(),
                    model.special_tokens().len()
                );
            }
        }
        for name in available_models() {
            assert!(from_pretrained(name).is_ok(), "{} failed to load", name);
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(PretrainedModel::P50kEdit.family(), PatternFamily::R50k);
        assert_eq!(PretrainedModel::Cl100kBase.family(), PatternFamily::Cl100k);
        assert_eq!(PretrainedModel::O200kHarmony.family(), PatternFamily::O200k);
    }

    #[test]
    fn test_harmony_special_tokens() {
        let special = o200k_harmony_special_tokens();
        // 200018 is named, so it is not also reserved
        assert_eq!(special.len(), 10 + 6 + (201088 - 200013) - 1);
        assert!(!special.iter().any(|(name, _)| name == "<|reserved_200018|>"));
        assert_eq!(special[0], ("<|startoftext|>".to_string(), 199998));
        assert_eq!(special[10], ("<|reserved_200000|>".to_string(), 200000));
        assert_eq!(
            special.last(),
            Some(&("<|reserved_201087|>".to_string(), 201087))
        );

        let mut ids: Vec<u32> = special.iter().map(|&(_, id)| id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), special.len(), "special ids must be unique");
        assert_eq!(ids.first(), Some(&199998));
        assert_eq!(ids.last(), Some(&201087));
    }

    #[test]
    fn test_p50k_edit_special_tokens() {
        let special = p50k_edit_special_tokens();
        assert_eq!(special.len(), 4);
        assert_eq!(special[3], (FIM_SUFFIX.to_string(), 50283));
    }

    #[test]
    fn test_from_pretrained_r50k() {
        let tokenizer = from_pretrained("r50k_base").unwrap();
        assert_eq!(tokenizer.vocab_size(), 50256);
        assert_eq!(tokenizer.encode("hello world"), vec![31373, 995]);
    }
}
