//! RediSearch vector index support for Fabryk.
//!
//! This crate compiles typed index schemas into `FT.CREATE` commands, builds
//! KNN and range `FT.SEARCH` queries, and provides a vector store that embeds,
//! writes and searches documents through a pluggable command executor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     fabryk-redis                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RedisVectorStore (embed + ensure index + write + search)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexDefinition ─▶ FT.CREATE    SearchRequest ─▶ FT.SEARCH │
//! │  IndexSchema (Tag / Text / Numeric / Vector fields)         │
//! │  SchemaSource (JSON/YAML), infer_schema (sample metadata)   │
//! │  Vector codec (f32/f64 ⇄ little-endian bytes)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  └── MockEmbeddingProvider                                  │
//! │  CommandExecutor trait                                      │
//! │  ├── RedisExecutor (redis-rs connection manager)            │
//! │  └── MockExecutor (in-memory)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fabryk_redis::{
//!     Document, MockEmbeddingProvider, RedisStoreConfig, RedisVectorStore, SearchOptions,
//! };
//! use std::sync::Arc;
//!
//! let config = RedisStoreConfig::new("users").with_url("redis://localhost:6379");
//! let store = RedisVectorStore::connect(config, Arc::new(MockEmbeddingProvider::new(384))).await?;
//!
//! store
//!     .add_documents(vec![Document::new("Tokyo").with_metadata("population", 38.2)])
//!     .await?;
//!
//! let options = SearchOptions::new().with_filter("@population:[30 +inf]");
//! for doc in store.similarity_search("Japan", 5, options).await? {
//!     println!("{}: {:.3}", doc.page_content, doc.score);
//! }
//! ```

// Wire-level building blocks
pub mod codec;
pub mod command;
pub mod index;
pub mod query;
pub mod schema;

// Schema generation and metadata
pub mod generator;
pub mod metadata;

// Execution
pub mod executor;
pub mod mock;
pub mod reply;

// Store
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod store;

// Re-exports: errors
pub use error::{Error, Result, WriteFailure};

// Re-exports: schema and commands
pub use codec::{VectorData, decode_f32, decode_f64, encode_f32, encode_f64};
pub use command::Command;
pub use generator::{SchemaFormat, SchemaSource, infer_schema};
pub use index::{IndexDefinition, StorageKind, key_prefix};
pub use query::{SearchRequest, SortBy, SortDirection};
pub use schema::{
    DistanceMetric, FieldKind, IndexSchema, NumericField, PhoneticMatcher, SchemaField, TagField,
    TextField, VectorAlgorithm, VectorDataType, VectorField,
};

// Re-exports: documents and metadata
pub use document::Document;
pub use metadata::{Metadata, MetadataValue};
pub use reply::{ReservedKeys, SearchResults, decode_field, decode_search_reply};

// Re-exports: traits and implementations
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
pub use executor::{CommandExecutor, RedisExecutor, Reply};
pub use mock::MockExecutor;

// Re-exports: store
pub use config::RedisStoreConfig;
pub use store::{RedisVectorStore, RedisVectorStoreBuilder, SearchOptions};
