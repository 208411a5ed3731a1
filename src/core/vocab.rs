//! Reading and writing the tiktoken base64 vocabulary format.
//!
//! The format used by OpenAI's tokenizers (GPT-2, GPT-3.5, GPT-4, GPT-4o) is a
//! plain text file where each line contains:
//! - A base64-encoded token (the byte sequence)
//! - Whitespace
//! - An integer rank (the token's priority in BPE merging, and its id)
//!
//! Lower ranks indicate higher priority - tokens with lower ranks are merged
//! first during the BPE encoding process.
//!
//! # Example Format
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! Where:
//! - `SGVsbG8=` decodes to `Hello` (rank 0, highest priority)
//! - `V29ybGQ=` decodes to `World` (rank 1)
//! - `IQ==` decodes to `!` (rank 2)
//!
//! The base64 step is kept as a named encode/decode boundary
//! ([`decode_token`], [`encode_token`]) so the on-disk format stays bit-exact.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// A parsed vocabulary line: token bytes and rank, in file order.
pub type VocabEntry = (Vec<u8>, u32);

/// Errors that can occur when loading or saving vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Malformed vocabulary at line {line}: {reason}")]
    MalformedVocabulary { line: usize, reason: String },
    #[error("Invalid vocabulary entry for id {id}: {reason}")]
    InvalidEntry { id: u32, reason: String },
    #[error("Duplicate rank in vocabulary: {0}")]
    DuplicateRank(u32),
    #[error("Duplicate token bytes in vocabulary at rank {rank}")]
    DuplicateToken { rank: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VocabError {
    fn malformed(line: usize, reason: impl Into<String>) -> Self {
        VocabError::MalformedVocabulary {
            line,
            reason: reason.into(),
        }
    }
}

/// Decode the base64 field of a vocabulary line.
#[inline]
pub fn decode_token(field: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(field)
}

/// Encode token bytes for the base64 field of a vocabulary line.
#[inline]
pub fn encode_token(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Parse a single non-empty line. `line_no` is 1-based and only used for errors.
fn parse_line(line: &[u8], line_no: usize) -> Result<VocabEntry, VocabError> {
    let sep = line
        .iter()
        .rposition(|b| b.is_ascii_whitespace())
        .ok_or_else(|| VocabError::malformed(line_no, "missing whitespace separator"))?;

    let token_b64 = line[..sep].trim_ascii_end();
    let rank_str = &line[sep + 1..];
    if token_b64.is_empty() {
        return Err(VocabError::malformed(line_no, "missing token field"));
    }

    let token = decode_token(token_b64)
        .map_err(|e| VocabError::malformed(line_no, format!("invalid base64: {}", e)))?;

    let rank_str = std::str::from_utf8(rank_str)
        .map_err(|_| VocabError::malformed(line_no, "invalid UTF-8 in rank"))?;
    let rank: u32 = rank_str
        .parse()
        .map_err(|_| VocabError::malformed(line_no, format!("invalid rank: {:?}", rank_str)))?;

    Ok((token, rank))
}

/// Load vocabulary entries from raw bytes.
///
/// Format: `base64_token rank\n` per line. Blank lines are skipped and a trailing
/// `\r` is tolerated. Entries are returned in file order.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(bytes = data.len())))]
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<Vec<VocabEntry>, VocabError> {
    let mut entries = Vec::new();

    for (idx, line) in data.split(|&b| b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        entries.push(parse_line(line, idx + 1)?);
    }

    log::debug!("parsed {} vocabulary entries", entries.len());
    Ok(entries)
}

/// Read vocabulary entries from any buffered reader.
pub fn read_tiktoken_bpe<R: BufRead>(mut reader: R) -> Result<Vec<VocabEntry>, VocabError> {
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        entries.push(parse_line(line, line_no)?);
    }

    Ok(entries)
}

/// Load vocabulary entries from a file path.
///
/// The file handle is dropped when this returns, whether parsing succeeded or not.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn load_tiktoken_bpe_file<P: AsRef<Path>>(path: P) -> Result<Vec<VocabEntry>, VocabError> {
    let file = File::open(path)?;
    read_tiktoken_bpe(BufReader::new(file))
}

/// Write entries in the base64 vocabulary format, one `{base64} {rank}` line each.
///
/// Entries are written in the order given; callers pass them sorted by rank.
pub fn write_tiktoken_bpe<'a, I, W>(entries: I, writer: &mut W) -> Result<usize, VocabError>
where
    I: IntoIterator<Item = (&'a [u8], u32)>,
    W: Write,
{
    let mut count = 0;
    for (bytes, rank) in entries {
        writeln!(writer, "{} {}", encode_token(bytes), rank)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Write entries to a file, creating or truncating it.
pub fn save_tiktoken_bpe_file<'a, I, P>(entries: I, path: P) -> Result<usize, VocabError>
where
    I: IntoIterator<Item = (&'a [u8], u32)>,
    P: AsRef<Path>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_tiktoken_bpe(entries, &mut writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_tiktoken_bpe() {
        // "Hello" base64 = "SGVsbG8="
        // "World" base64 = "V29ybGQ="
        let data = b"SGVsbG8= 0\nV29ybGQ= 1\n";
        let entries = load_tiktoken_bpe(data).unwrap();

        assert_eq!(
            entries,
            vec![(b"Hello".to_vec(), 0), (b"World".to_vec(), 1)]
        );
    }

    #[test]
    fn test_load_tolerates_crlf_and_blank_lines() {
        let data = b"SGVsbG8= 0\r\n\r\nV29ybGQ=\t1\r\n";
        let entries = load_tiktoken_bpe(data).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], (b"World".to_vec(), 1));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let err = load_tiktoken_bpe(b"SGVsbG8= 0\nV29ybGQ=\n").unwrap_err();
        match err {
            VocabError::MalformedVocabulary { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_counts_blank_lines() {
        let err = load_tiktoken_bpe(b"SGVsbG8= 0\n\n\nV29ybGQ=\n").unwrap_err();
        assert!(matches!(
            err,
            VocabError::MalformedVocabulary { line: 4, .. }
        ));

        let err = read_tiktoken_bpe(&b"\r\nSGVsbG8= 0\n\nbroken\n"[..]).unwrap_err();
        assert!(matches!(
            err,
            VocabError::MalformedVocabulary { line: 4, .. }
        ));
    }

    #[test]
    fn test_bad_base64_is_malformed() {
        let err = load_tiktoken_bpe(b"!!!notbase64 0\n").unwrap_err();
        assert!(matches!(
            err,
            VocabError::MalformedVocabulary { line: 1, .. }
        ));
    }

    #[test]
    fn test_bad_rank_is_malformed() {
        let err = load_tiktoken_bpe(b"SGVsbG8= -3\n").unwrap_err();
        assert!(matches!(err, VocabError::MalformedVocabulary { .. }));
        let err = load_tiktoken_bpe(b"SGVsbG8= seven\n").unwrap_err();
        assert!(matches!(err, VocabError::MalformedVocabulary { .. }));
    }

    #[test]
    fn test_write_then_read() {
        let entries: Vec<(&[u8], u32)> = vec![(b"  ", 256), (b"in", 258), (&[0xff, 0x00], 300)];
        let mut out = Vec::new();
        let written = write_tiktoken_bpe(entries.iter().copied(), &mut out).unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            std::str::from_utf8(&out).unwrap(),
            "ICA= 256\naW4= 258\n/wA= 300\n"
        );

        let read = read_tiktoken_bpe(out.as_slice()).unwrap();
        assert_eq!(read[2], (vec![0xff, 0x00], 300));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_tiktoken_bpe_file("/definitely/not/here.tiktoken").unwrap_err();
        assert!(matches!(err, VocabError::Io(_)));
    }
}
