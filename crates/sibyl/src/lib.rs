//! Sibyl — a semantic search gateway with agentic routing and a persistent
//! semantic cache.
//!
//! This crate re-exports all Sibyl sub-crates for convenient single-import
//! usage.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sibyl::cache::{SemanticCache, SemanticCacheConfig};
//! use sibyl::core::{ChatModel, Embeddings, QueryType};
//! use sibyl::gateway::Gateway;
//! ```

/// Core traits and types: ChatModel, Embeddings, DocumentRetriever,
/// WebSearch, SibylError, and the query domain types.
pub use sibyl_core as core;

/// Chat model adapters (OpenAI wire format), the HTTP provider backend, and
/// test doubles.
pub use sibyl_models as models;

/// Embeddings providers: Ollama-served models and a deterministic fake.
pub use sibyl_embeddings as embeddings;

/// The semantic cache: flat L2 index, durable store, hit/miss engine.
pub use sibyl_cache as cache;

/// LLM-backed query classification and sub-query division.
pub use sibyl_router as router;

/// Qdrant-backed document retrieval.
pub use sibyl_qdrant as qdrant;

/// Live web search providers.
pub use sibyl_search as search;

/// The RAG orchestration pipeline.
pub use sibyl_gateway as gateway;
