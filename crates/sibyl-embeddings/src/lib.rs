mod fake;
mod ollama;

pub use fake::FakeEmbeddings;
pub use ollama::{OllamaEmbeddings, OllamaEmbeddingsConfig};
