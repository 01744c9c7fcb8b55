//! Core types for the RAG chatbot

pub mod document;
pub mod response;

pub use document::{Chunk, DocumentMetadata, FileType, SourceDocument};
pub use response::{AskRequest, AskResponse, ChatTurn};
