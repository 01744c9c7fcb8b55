//! Prompt template for answer generation

use crate::types::Chunk;

/// Prompt builder for RAG questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Chunk contents joined by newlines
    pub fn build_context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the question prompt around an already built context
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            "You are a helpful assistant. Use the context below to answer the question.\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question:\n\
             {question}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentMetadata, FileType};

    #[test]
    fn test_prompt_layout() {
        let meta = DocumentMetadata::new("notes.txt", FileType::Txt);
        let chunks = vec![
            Chunk::new("Rust has no GC.".to_string(), meta.clone(), 0),
            Chunk::new("Ownership frees memory.".to_string(), meta, 1),
        ];

        let context = PromptBuilder::build_context(&chunks);
        let prompt = PromptBuilder::build_prompt("How is memory freed?", &context);

        assert_eq!(
            prompt,
            "You are a helpful assistant. Use the context below to answer the question.\n\n\
             Context:\nRust has no GC.\nOwnership frees memory.\n\n\
             Question:\nHow is memory freed?\n"
        );
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(PromptBuilder::build_context(&[]), "");
        let prompt = PromptBuilder::build_prompt("q", "");
        assert!(prompt.contains("Context:\n\n\nQuestion:\nq\n"));
    }
}
