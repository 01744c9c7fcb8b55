//! Brute-force cosine vector index with JSON persistence

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Chunk;

/// File name of the persisted index inside the index directory
pub const INDEX_FILE: &str = "index.json";

/// A stored chunk and its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub content_hash: String,
}

/// Search hit with cosine similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity in [-1.0, 1.0], higher is better
    pub similarity: f32,
}

/// In-memory vector index
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Fixed by the first insert
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
    #[serde(skip)]
    hashes: HashSet<String>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Whether a chunk with this content hash is already stored
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Insert a chunk; returns `false` when an identical chunk is already stored
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<bool> {
        if vector.is_empty() {
            return Err(Error::vector_db("Cannot index an empty vector"));
        }

        match self.dimensions {
            Some(dims) if dims != vector.len() => {
                return Err(Error::VectorDb(format!(
                    "Dimension mismatch: index has {}, vector has {}",
                    dims,
                    vector.len()
                )));
            }
            Some(_) => {}
            None => self.dimensions = Some(vector.len()),
        }

        let content_hash = chunk.content_hash();
        if !self.hashes.insert(content_hash.clone()) {
            return Ok(false);
        }

        self.entries.push(IndexEntry {
            chunk,
            vector,
            content_hash,
        });
        Ok(true)
    }

    /// Top `k` chunks by cosine similarity, optionally restricted to one source
    pub fn search(&self, query: &[f32], k: usize, source: Option<&str>) -> Result<Vec<SearchResult>> {
        if let Some(dims) = self.dimensions {
            if dims != query.len() {
                return Err(Error::VectorDb(format!(
                    "Query dimension mismatch: index has {}, query has {}",
                    dims,
                    query.len()
                )));
            }
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter(|e| source.map_or(true, |s| e.chunk.metadata.source == s))
            .map(|e| SearchResult {
                chunk: e.chunk.clone(),
                similarity: cosine_similarity(query, &e.vector),
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(k);
        Ok(results)
    }

    /// Drop entries from `source` whose hash is not in `keep`, returning how many were dropped
    pub fn retain_source(&mut self, source: &str, keep: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.chunk.metadata.source != source || keep.contains(&e.content_hash));

        let removed = before - self.entries.len();
        if removed > 0 {
            self.hashes = self.entries.iter().map(|e| e.content_hash.clone()).collect();
        }
        if self.entries.is_empty() {
            self.dimensions = None;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hashes.clear();
        self.dimensions = None;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut index: Self = serde_json::from_slice(data)
            .map_err(|e| Error::VectorDb(format!("Corrupt index file: {}", e)))?;
        index.hashes = index.entries.iter().map(|e| e.content_hash.clone()).collect();
        Ok(index)
    }

    /// Path of the index file inside `dir`
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Write the index to `dir`, replacing any previous file atomically
    pub async fn save(&self, dir: &Path) -> Result<()> {
        Self::write_bytes(dir, self.to_bytes()?).await
    }

    /// Write already serialized index bytes to `dir`
    pub async fn write_bytes(dir: &Path, bytes: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let target = Self::file_path(dir);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    /// Load the index from `dir`; `None` when no index has been saved there
    pub async fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::file_path(dir);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Self::from_bytes(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cosine similarity; zero when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
