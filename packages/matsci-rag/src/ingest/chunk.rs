//! Recursive character splitting of material descriptions.
//!
//! Descriptions are `; `-separated property groups. The splitter tries the
//! coarsest separator first and only falls back to finer ones for pieces
//! that are still too long, so chunks break between property groups where
//! possible. Lengths are counted in characters.

use std::collections::VecDeque;

use crate::error::{RagError, Result};

const SEPARATORS: [&str; 4] = ["; ", ", ", " ", ""];

/// Split `text` into chunks of at most `chunk_size` characters, with
/// neighbouring chunks sharing up to `overlap` characters.
///
/// Fails if `overlap` is not smaller than `chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(RagError::invalid_input("chunk size must be positive"));
    }
    if overlap >= chunk_size {
        return Err(RagError::invalid_input(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    Ok(split_recursive(text, &SEPARATORS, chunk_size, overlap))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], chunk_size: usize, overlap: usize) -> Vec<String> {
    let (index, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
        .map(|(i, sep)| (i, *sep))
        .unwrap_or((separators.len().saturating_sub(1), ""));
    let finer = &separators[(index + 1).min(separators.len())..];

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator).map(str::to_string).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();

    for piece in pieces {
        if char_len(&piece) < chunk_size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge(&fitting, separator, chunk_size, overlap));
            fitting.clear();
        }
        if finer.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_recursive(&piece, finer, chunk_size, overlap));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge(&fitting, separator, chunk_size, overlap));
    }

    chunks
}

/// Greedily pack pieces into chunks, carrying the tail of each chunk into
/// the next one as overlap.
fn merge(pieces: &[String], separator: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(piece);
        let joined = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

        if total + len + joined(&current) > chunk_size && !current.is_empty() {
            push_chunk(&mut chunks, &current, separator);

            while total > overlap
                || (total > 0 && total + len + joined(&current) > chunk_size)
            {
                let Some(first) = current.pop_front() else {
                    break;
                };
                total -= char_len(first) + if current.is_empty() { 0 } else { sep_len };
            }
        }

        total += len + joined(&current);
        current.push_back(piece);
    }
    push_chunk(&mut chunks, &current, separator);

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    let chunk = current.iter().copied().collect::<Vec<_>>().join(separator);
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let text = "Material ID: mp-1; Stability: Stable";
        assert_eq!(split_text(text, 2000, 200).unwrap(), vec![text]);
    }

    #[test]
    fn test_splits_between_property_groups() {
        let text = "Material ID: mp-1; Stability: Stable; Electronic properties: band gap = 1.000 eV";
        let chunks = split_text(text, 40, 0).unwrap();
        assert_eq!(
            chunks,
            vec![
                "Material ID: mp-1; Stability: Stable",
                "Electronic properties: band gap = 1.000",
                "eV",
            ]
        );
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text = "aa; bb; cc; dd";
        let chunks = split_text(text, 6, 2).unwrap();
        assert_eq!(chunks, vec!["aa; bb", "bb; cc", "cc; dd"]);
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(split_text("x", 10, 10).is_err());
        assert!(split_text("x", 0, 0).is_err());
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 100, 10).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_chunks_bounded_and_cover_words(
            words in prop::collection::vec("[a-z]{1,12}", 1..40),
            chunk_size in 16usize..64,
        ) {
            let text = words.join("; ");
            let chunks = split_text(&text, chunk_size, chunk_size / 4).unwrap();

            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= chunk_size);
            }
            for word in &words {
                prop_assert!(chunks.iter().any(|c| c.contains(word.as_str())));
            }
        }
    }
}
