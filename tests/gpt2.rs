//! Integration tests for the r50k_base, p50k_base and p50k_edit tokenizers.

use std::sync::LazyLock;

use bytemerge::{PatternFamily, Tokenizer};

static R50K: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::from_pretrained("r50k_base").unwrap());

static P50K: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::from_pretrained("openai/p50k_base").unwrap());

static P50K_EDIT: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::from_pretrained("p50k_edit").unwrap());

/// Test exact ids for short inputs.
#[test]
fn test_known_ids() {
    assert_eq!(R50K.encode("hello world"), vec![31373, 995]);
    assert_eq!(P50K.encode("hello world"), vec![31373, 995]);
    assert_eq!(R50K.encode("    indented"), vec![220, 220, 220, 773, 4714]);
}

/// Test vocabulary sizes; p50k has a gap at the endoftext id.
#[test]
fn test_vocab_sizes() {
    assert_eq!(R50K.vocab_size(), 50256);
    assert_eq!(R50K.max_token(), 50256);
    assert_eq!(P50K.vocab_size(), 50280);
    assert_eq!(P50K.max_token(), 50280);
    assert_eq!(P50K_EDIT.max_token(), 50283);
    assert_eq!(R50K.family(), PatternFamily::R50k);
    assert_eq!(P50K_EDIT.family(), PatternFamily::R50k);
}

/// Test special tokens per model.
#[test]
fn test_special_tokens() {
    assert_eq!(R50K.encode_with_special("<|endoftext|>"), vec![50256]);
    assert_eq!(P50K.get_special_tokens().len(), 1);

    let tokens = P50K_EDIT.encode_with_special("<|fim_prefix|>a<|fim_suffix|>b<|fim_middle|>");
    assert_eq!(tokens.first(), Some(&50281));
    assert!(tokens.contains(&50283));
    assert_eq!(tokens.last(), Some(&50282));
}

/// Test that p50k merges whitespace runs that r50k leaves as single spaces.
#[test]
fn test_p50k_whitespace_runs() {
    let code = "def f():\n        return 1\n";
    let r50k = R50K.encode(code);
    let p50k = P50K.encode(code);
    assert!(p50k.len() < r50k.len(), "p50k should merge the indentation");
    assert_eq!(P50K.decode(&p50k).unwrap(), code);
    assert_eq!(R50K.decode(&r50k).unwrap(), code);
}

/// Test basic encoding and decoding roundtrip.
#[test]
fn test_roundtrip() {
    for text in ["", "GPT-2 era text, 2019.", "Ünïcödé ✓", "\t\r\n"] {
        for tokenizer in [&*R50K, &*P50K, &*P50K_EDIT] {
            let tokens = tokenizer.encode(text);
            assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
        }
    }
}
