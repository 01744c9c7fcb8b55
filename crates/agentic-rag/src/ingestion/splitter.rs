//! Recursive character text splitting with overlap

use crate::types::{Chunk, SourceDocument};

/// Separators tried in order: paragraphs, lines, words, characters
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text on the coarsest separator that keeps pieces under `chunk_size`,
/// recursing to finer separators only for pieces that are still too long.
///
/// Lengths are counted in `char`s. Separators are kept at the start of the
/// piece that follows them, so joining the chunks of a text without overlap
/// reproduces it modulo trimmed whitespace.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split loaded documents into chunks, copying each document's metadata
    pub fn split_documents(&self, docs: &[SourceDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in docs {
            for text in self.split_text(&doc.content) {
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(text, doc.metadata.clone(), index));
            }
        }

        chunks
    }

    /// Split a single text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // First separator present in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_keeping_separator(text, separator);
        let mut good_splits: Vec<&str> = Vec::new();

        for piece in splits {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily merge pieces up to `chunk_size`, carrying at most
    /// `chunk_overlap` characters of trailing pieces into the next chunk
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    push_joined(&mut docs, &current);

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        push_joined(&mut docs, &current);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, pieces: &std::collections::VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, attaching each separator to the start of the piece
/// after it. An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentMetadata, FileType};
    use proptest::prelude::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = TextSplitter::new(1000, 200);
        let chunks = splitter.split_text("  A short note.\n\nWith two paragraphs.  ");
        assert_eq!(chunks, vec!["A short note.\n\nWith two paragraphs."]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let splitter = TextSplitter::new(100, 20);
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_paragraphs_are_preferred_boundaries() {
        let splitter = TextSplitter::new(30, 0);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = splitter.split_text(text);

        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here.", "Third one."]
        );
    }

    #[test]
    fn test_words_overlap_between_chunks() {
        let splitter = TextSplitter::new(10, 4);
        let chunks = splitter.split_text("aaa bbb ccc ddd eee");

        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd", "ddd eee"]);
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let splitter = TextSplitter::new(4, 0);
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_multibyte_lengths_are_in_chars() {
        let splitter = TextSplitter::new(3, 0);
        let chunks = splitter.split_text("ééééé");
        assert_eq!(chunks, vec!["ééé", "éé"]);
    }

    #[test]
    fn test_split_documents_copies_metadata() {
        let splitter = TextSplitter::new(10, 0);
        let mut page = DocumentMetadata::new("report.pdf", FileType::Pdf);
        page.page = Some(1);
        let docs = vec![
            SourceDocument::new("one two three", DocumentMetadata::new("report.pdf", FileType::Pdf)),
            SourceDocument::new("four", page.clone()),
        ];

        let chunks = splitter.split_documents(&docs);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].content, "four");
        assert_eq!(chunks[2].metadata, page);
        let indexes: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_chunks_respect_size(text in "[a-z \\n]{0,400}", size in 5usize..60) {
            let splitter = TextSplitter::new(size, size / 4);
            for chunk in splitter.split_text(&text) {
                prop_assert!(chunk.chars().count() <= size);
                prop_assert!(!chunk.trim().is_empty());
            }
        }
    }
}
