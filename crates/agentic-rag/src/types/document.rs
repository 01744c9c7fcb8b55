//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// CSV file
    Csv,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
}

impl FileType {
    /// Every accepted upload extension
    pub const EXTENSIONS: [&'static str; 5] = ["pdf", "docx", "csv", "txt", "pptx"];

    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "csv" => Some(Self::Csv),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Csv => "CSV",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
        }
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Path of the loaded file
    pub source: String,
    /// File type
    pub file_type: FileType,
    /// Page number (0-indexed, PDF only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Row number (0-indexed, CSV only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
}

impl DocumentMetadata {
    /// Metadata for a whole-file document
    pub fn new(source: impl Into<String>, file_type: FileType) -> Self {
        Self {
            source: source.into(),
            file_type,
            page: None,
            row: None,
        }
    }

    /// Format the location for display
    pub fn format_location(&self) -> String {
        let mut parts = vec![self.source.clone()];

        if let Some(page) = self.page {
            parts.push(format!("Page {}", page + 1));
        }

        if let Some(row) = self.row {
            parts.push(format!("Row {}", row + 1));
        }

        parts.join(", ")
    }
}

/// A loaded document, before splitting
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Extracted text
    pub content: String,
    /// Source information
    pub metadata: DocumentMetadata,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content
    pub content: String,
    /// Source information inherited from the loaded document
    pub metadata: DocumentMetadata,
    /// Chunk index within the file
    pub chunk_index: u32,
    /// Similarity score, set on search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: String, metadata: DocumentMetadata, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            metadata,
            chunk_index,
            score: None,
        }
    }

    /// SHA-256 of the source path and content, used to skip re-indexing
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.metadata.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// First `max_chars` characters of the content
    pub fn preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path(Path::new("docs/report.PDF")), Some(FileType::Pdf));
        assert_eq!(FileType::from_path(Path::new("slides.pptx")), Some(FileType::Pptx));
        assert_eq!(FileType::from_path(Path::new("notes.md")), None);
        assert_eq!(FileType::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_content_hash_depends_on_source() {
        let a = Chunk::new("same text".into(), DocumentMetadata::new("a.txt", FileType::Txt), 0);
        let b = Chunk::new("same text".into(), DocumentMetadata::new("b.txt", FileType::Txt), 0);
        let a2 = Chunk::new("same text".into(), DocumentMetadata::new("a.txt", FileType::Txt), 3);

        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash(), a2.content_hash());
    }

    #[test]
    fn test_format_location() {
        let mut meta = DocumentMetadata::new("report.pdf", FileType::Pdf);
        meta.page = Some(0);
        assert_eq!(meta.format_location(), "report.pdf, Page 1");
    }
}
