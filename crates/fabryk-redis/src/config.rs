//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generator::{SchemaFormat, SchemaSource};
use crate::index::{StorageKind, key_prefix};
use crate::reply::ReservedKeys;

/// Configuration for a [`RedisVectorStore`](crate::RedisVectorStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Connection URL (e.g. `redis://localhost:6379`).
    #[serde(default = "default_url")]
    pub url: String,

    /// Search index name.
    #[serde(default)]
    pub index_name: String,

    /// Create the index when it does not exist.
    #[serde(default = "default_true")]
    pub create_index_if_not_exists: bool,

    /// Record storage kind.
    #[serde(default)]
    pub storage: StorageKind,

    /// Document key prefix; `doc:<index_name>` when unset.
    pub key_prefix: Option<String>,

    /// Reserved field for the page content.
    #[serde(default = "default_content_key")]
    pub content_key: String,

    /// Reserved field for the embedding.
    #[serde(default = "default_vector_key")]
    pub vector_key: String,

    /// Alias bound to the computed distance in search results.
    #[serde(default = "default_distance_key")]
    pub distance_key: String,

    /// Result count when the caller passes 0.
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Schema document to load at build time.
    pub schema_path: Option<PathBuf>,

    /// Schema document format; inferred from the extension when unset.
    pub schema_format: Option<SchemaFormat>,
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_true() -> bool {
    true
}

fn default_content_key() -> String {
    "content".to_string()
}

fn default_vector_key() -> String {
    "content_vector".to_string()
}

fn default_distance_key() -> String {
    "distance".to_string()
}

fn default_k() -> usize {
    4
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            index_name: String::new(),
            create_index_if_not_exists: default_true(),
            storage: StorageKind::default(),
            key_prefix: None,
            content_key: default_content_key(),
            vector_key: default_vector_key(),
            distance_key: default_distance_key(),
            default_k: default_k(),
            schema_path: None,
            schema_format: None,
        }
    }
}

impl RedisStoreConfig {
    /// Create a config for `index_name` with defaults elsewhere.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Default::default()
        }
    }

    /// Set the connection URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set whether a missing index is created.
    pub fn with_create_index(mut self, create: bool) -> Self {
        self.create_index_if_not_exists = create;
        self
    }

    /// Set the document key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the schema file.
    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    /// Effective document key prefix.
    pub fn prefix(&self) -> String {
        match self.key_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => key_prefix(&self.index_name),
        }
    }

    /// The reserved content, vector and distance keys.
    pub fn reserved_keys(&self) -> ReservedKeys {
        ReservedKeys {
            content: self.content_key.clone(),
            vector: self.vector_key.clone(),
            distance: self.distance_key.clone(),
        }
    }

    /// Schema source for `schema_path`, if set.
    pub fn schema_source(&self) -> Option<SchemaSource> {
        let path = self.schema_path.as_ref()?;
        Some(match self.schema_format {
            Some(format) => SchemaSource::from_file(format, path),
            None => SchemaSource::from_path(path),
        })
    }

    /// Check field-level consistency.
    pub fn validate(&self) -> Result<()> {
        if self.index_name.is_empty() {
            return Err(Error::MissingIndexName);
        }
        let keys = [&self.content_key, &self.vector_key, &self.distance_key];
        if keys.iter().any(|k| k.is_empty()) {
            return Err(Error::config("reserved keys must not be empty"));
        }
        if self.content_key == self.vector_key
            || self.content_key == self.distance_key
            || self.vector_key == self.distance_key
        {
            return Err(Error::config("reserved keys must be distinct"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedisStoreConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert!(config.index_name.is_empty());
        assert!(config.create_index_if_not_exists);
        assert_eq!(config.storage, StorageKind::Hash);
        assert_eq!(config.content_key, "content");
        assert_eq!(config.vector_key, "content_vector");
        assert_eq!(config.distance_key, "distance");
        assert_eq!(config.default_k, 4);
        assert!(config.schema_source().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: RedisStoreConfig = toml::from_str(
            r#"
index_name = "users"
storage = "json"
schema_path = "schema.json"
"#,
        )
        .unwrap();
        assert_eq!(config.index_name, "users");
        assert_eq!(config.storage, StorageKind::Json);
        assert_eq!(config.default_k, 4);
        assert_eq!(config.schema_source().unwrap().format(), SchemaFormat::Json);
    }

    #[test]
    fn test_prefix() {
        let config = RedisStoreConfig::new("users");
        assert_eq!(config.prefix(), "doc:users");
        assert_eq!(config.with_key_prefix("u").prefix(), "u");
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            RedisStoreConfig::default().validate(),
            Err(Error::MissingIndexName)
        ));
        assert!(RedisStoreConfig::new("idx").validate().is_ok());

        let clash = RedisStoreConfig {
            vector_key: "content".into(),
            ..RedisStoreConfig::new("idx")
        };
        assert!(matches!(clash.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_reserved_keys() {
        assert_eq!(RedisStoreConfig::new("x").reserved_keys(), ReservedKeys::default());
    }
}
