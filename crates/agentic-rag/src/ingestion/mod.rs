//! Document ingestion: loading files and splitting them into chunks

mod agent;
mod loader;
mod splitter;

pub use agent::IngestionAgent;
pub use loader::DocumentLoader;
pub use splitter::{TextSplitter, DEFAULT_SEPARATORS};
