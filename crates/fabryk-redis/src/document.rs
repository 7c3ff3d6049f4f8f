//! Document record.

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, MetadataValue};

/// A piece of text with metadata, as written to and read from the store.
///
/// On search results `score` holds the engine-computed distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content.
    pub page_content: String,

    /// Distance reported by the search, 0 on input documents.
    #[serde(default)]
    pub score: f32,

    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            ..Default::default()
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the metadata.
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Metadata entry by key.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}
