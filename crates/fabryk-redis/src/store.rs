//! Redis vector store.
//!
//! [`RedisVectorStore`] ties the pieces together: it embeds documents with an
//! [`EmbeddingProvider`], makes sure the search index exists, writes hash
//! records through a [`CommandExecutor`] and runs similarity searches.
//!
//! # Index lifecycle
//!
//! - At build time the index is checked with `FT.INFO`. If it is missing and
//!   creation is disabled, the build fails with [`Error::IndexNotFound`].
//! - If a schema is known at build time (explicit or from a schema document)
//!   a missing index is created immediately.
//! - Otherwise the schema is inferred from the first document written and
//!   the index is created then.
//!
//! Once the index exists the schema is only used to pick `RETURN` fields and
//! to type reply values; it is never re-applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::codec::VectorData;
use crate::command::Command;
use crate::config::RedisStoreConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result, WriteFailure};
use crate::executor::{CommandExecutor, RedisExecutor};
use crate::generator::{SchemaSource, infer_schema};
use crate::index::{self, IndexDefinition, StorageKind};
use crate::metadata::{Metadata, MetadataValue};
use crate::query::{SearchRequest, SortBy};
use crate::reply::{ReservedKeys, SearchResults, decode_search_reply};
use crate::schema::{DEFAULT_TAG_SEPARATOR, IndexSchema, TagField, VectorField};

// ============================================================================
// Search options
// ============================================================================

/// Per-call search options.
#[derive(Clone, Default)]
pub struct SearchOptions {
    /// Distance threshold in `[0, 1]`; values strictly inside switch the
    /// search to range mode, 0 and 1 mean "no threshold".
    pub score_threshold: f32,

    /// Pre-filter expression. Only JSON strings are accepted, e.g.
    /// `"@job:{engineer}"`.
    pub filters: Option<serde_json::Value>,

    /// Embedder used for the query instead of the store's own.
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,

    /// Number of results to skip.
    pub offset: usize,

    /// Ordering other than ascending distance.
    pub sort_by: Option<SortBy>,
}

impl SearchOptions {
    /// Options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set a pre-filter query string.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters = Some(serde_json::Value::String(filter.into()));
        self
    }

    /// Set the raw filters value.
    pub fn with_filters(mut self, filters: serde_json::Value) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Embed the query with `embedder`.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Skip the first `offset` results.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Override the ordering.
    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    fn validated_threshold(&self) -> Result<f32> {
        if (0.0..=1.0).contains(&self.score_threshold) {
            Ok(self.score_threshold)
        } else {
            Err(Error::InvalidScoreThreshold(self.score_threshold))
        }
    }

    fn validated_filter(&self) -> Result<Option<String>> {
        match &self.filters {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Error::InvalidFilters),
        }
    }
}

impl std::fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOptions")
            .field("score_threshold", &self.score_threshold)
            .field("filters", &self.filters)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .field("offset", &self.offset)
            .field("sort_by", &self.sort_by)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`RedisVectorStore`].
#[derive(Default)]
pub struct RedisVectorStoreBuilder {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    executor: Option<Arc<dyn CommandExecutor>>,
    config: RedisStoreConfig,
    schema_source: Option<SchemaSource>,
    schema: Option<IndexSchema>,
}

impl RedisVectorStoreBuilder {
    /// Set the embedding provider (required).
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the command executor (required).
    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RedisStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the index name and whether a missing index is created.
    pub fn index_name(mut self, name: impl Into<String>, create_if_missing: bool) -> Self {
        self.config.index_name = name.into();
        self.config.create_index_if_not_exists = create_if_missing;
        self
    }

    /// Load the schema from a JSON/YAML document.
    pub fn schema_source(mut self, source: SchemaSource) -> Self {
        self.schema_source = Some(source);
        self
    }

    /// Use an explicit schema. Takes precedence over any schema source.
    pub fn schema(mut self, schema: IndexSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validate options, resolve the schema and check the index.
    pub async fn build(self) -> Result<RedisVectorStore> {
        if self.config.index_name.is_empty() {
            return Err(Error::MissingIndexName);
        }
        let embedder = self.embedder.ok_or(Error::MissingEmbedder)?;
        let executor = self.executor.ok_or(Error::MissingExecutor)?;
        self.config.validate()?;
        if self.config.storage == StorageKind::Json {
            return Err(Error::config(
                "the store writes hash records; JSON storage is only supported when compiling index definitions",
            ));
        }

        let schema = match (self.schema, self.schema_source) {
            (Some(schema), _) => {
                schema.validate()?;
                Some(schema)
            }
            (None, Some(source)) => Some(source.generate()?),
            (None, None) => self
                .config
                .schema_source()
                .map(|source| source.generate())
                .transpose()?,
        };

        let store = RedisVectorStore {
            embedder,
            executor,
            keys: self.config.reserved_keys(),
            prefix: self.config.prefix(),
            config: self.config,
            schema: RwLock::new(schema),
        };

        let name = store.config.index_name.clone();
        if !store.index_exists(&name).await? {
            if !store.config.create_index_if_not_exists {
                return Err(Error::IndexNotFound(name));
            }
            let known = store.schema.read().await.clone();
            if let Some(schema) = known {
                store.create_index(&schema).await?;
            } else {
                log::debug!("Index '{name}' will be created from the first written document");
            }
        }

        log::debug!(
            "Built redis vector store for index '{}' ({} executor, {} embedder)",
            name,
            store.executor.name(),
            store.embedder.name()
        );
        Ok(store)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Vector store over a RediSearch index of hash records.
pub struct RedisVectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    executor: Arc<dyn CommandExecutor>,
    config: RedisStoreConfig,
    keys: ReservedKeys,
    prefix: String,
    schema: RwLock<Option<IndexSchema>>,
}

impl RedisVectorStore {
    /// Start building a store.
    pub fn builder() -> RedisVectorStoreBuilder {
        RedisVectorStoreBuilder::default()
    }

    /// Connect to `config.url` and build a store.
    pub async fn connect(
        config: RedisStoreConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let executor = RedisExecutor::connect(&config.url).await?;
        Self::builder()
            .config(config)
            .embedder(embedder)
            .executor(Arc::new(executor))
            .build()
            .await
    }

    /// The index name.
    pub fn index_name(&self) -> &str {
        &self.config.index_name
    }

    /// The configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    /// The document key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The schema currently known to the store.
    pub async fn schema(&self) -> Option<IndexSchema> {
        self.schema.read().await.clone()
    }

    // ------------------------------------------------------------------------
    // Index management
    // ------------------------------------------------------------------------

    /// Whether `name` exists, by `FT.INFO`.
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        index::index_exists(self.executor.as_ref(), name).await
    }

    /// Create the store's index if it does not exist.
    ///
    /// Returns whether an index was created. Check-then-act: two callers
    /// racing on a fresh index may see [`Error::IndexAlreadyExists`].
    pub async fn ensure_index(&self) -> Result<bool> {
        if self.index_exists(self.index_name()).await? {
            return Ok(false);
        }
        let schema = self.schema.read().await.clone().ok_or_else(|| {
            Error::config(format!(
                "cannot create index '{}' without a schema",
                self.index_name()
            ))
        })?;
        self.create_index(&schema).await?;
        Ok(true)
    }

    /// Drop `name`, deleting its documents when `delete_documents` is set.
    pub async fn drop_index(&self, name: &str, delete_documents: bool) -> Result<()> {
        index::drop_index(self.executor.as_ref(), name, delete_documents).await
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let definition = IndexDefinition::new(
            self.index_name(),
            vec![self.prefix.clone()],
            self.config.storage,
            schema.clone(),
        );
        index::create_index(self.executor.as_ref(), &definition).await
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Embed and write documents as one pipelined batch.
    ///
    /// Returns the keys of the written documents. When some writes fail the
    /// error is [`Error::PartialWrite`], carrying the keys that did succeed.
    pub async fn add_documents(&self, mut docs: Vec<Document>) -> Result<Vec<String>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let schema = self.prepare(&mut docs).await?;

        let (keys, commands): (Vec<String>, Vec<Command>) = docs
            .iter()
            .map(|doc| self.hset_command(doc, schema.as_ref()))
            .unzip();
        let replies = self.executor.execute_pipeline(commands).await?;

        let mut ids = Vec::with_capacity(keys.len());
        let mut failures = Vec::new();
        for (index, (key, reply)) in keys.into_iter().zip(replies).enumerate() {
            match reply {
                Ok(_) => ids.push(key),
                Err(e) => failures.push(WriteFailure {
                    index,
                    key,
                    message: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            log::debug!("Wrote {} documents to '{}'", ids.len(), self.index_name());
            Ok(ids)
        } else {
            log::warn!(
                "{} of {} document writes to '{}' failed",
                failures.len(),
                failures.len() + ids.len(),
                self.index_name()
            );
            Err(Error::PartialWrite { ids, failures })
        }
    }

    /// Embed and write a single document.
    pub async fn add_document(&self, doc: Document) -> Result<String> {
        let mut docs = vec![doc];
        let schema = self.prepare(&mut docs).await?;
        let (key, command) = self.hset_command(&docs[0], schema.as_ref());
        self.executor.execute(command).await?;
        Ok(key)
    }

    /// Embed missing vectors, fill the reserved keys, settle the schema,
    /// conform vectors to it and make sure the index exists.
    async fn prepare(&self, docs: &mut [Document]) -> Result<Option<IndexSchema>> {
        let missing: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| {
                !matches!(doc.metadata.get(&self.keys.vector), Some(MetadataValue::Vector(_)))
            })
            .map(|(i, _)| i)
            .collect();

        if !missing.is_empty() {
            let texts: Vec<String> = missing
                .iter()
                .map(|&i| docs[i].page_content.clone())
                .collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(Error::InvalidEmbedding {
                    expected: texts.len(),
                    actual: vectors.len(),
                });
            }
            for (&i, vector) in missing.iter().zip(vectors) {
                docs[i]
                    .metadata
                    .insert(self.keys.vector.clone(), MetadataValue::Vector(VectorData::F32(vector)));
            }
        }

        for doc in docs.iter_mut() {
            let content = MetadataValue::String(doc.page_content.clone());
            doc.metadata.insert(self.keys.content.clone(), content);
        }

        self.settle_schema(&docs[0].metadata).await?;
        let schema = self.schema.read().await.clone();
        if let Some(field) = schema.as_ref().and_then(|s| s.vector_field(&self.keys.vector)) {
            for doc in docs.iter_mut() {
                if let Some(MetadataValue::Vector(vector)) = doc.metadata.get_mut(&self.keys.vector) {
                    *vector = conform_vector(field, vector.clone())?;
                }
            }
        }

        if self.config.create_index_if_not_exists {
            self.ensure_index().await?;
        }
        Ok(schema)
    }

    /// Infer the schema from `sample` unless one is already known.
    async fn settle_schema(&self, sample: &Metadata) -> Result<()> {
        if self.schema.read().await.is_some() {
            return Ok(());
        }
        let inferred = infer_schema(sample, &self.keys.vector)?;
        let mut schema = self.schema.write().await;
        if schema.is_none() {
            log::debug!(
                "Inferred schema with {} fields for index '{}'",
                inferred.len(),
                self.index_name()
            );
            *schema = Some(inferred);
        }
        Ok(())
    }

    fn hset_command(&self, doc: &Document, schema: Option<&IndexSchema>) -> (String, Command) {
        let key = document_key(&self.prefix, &doc.metadata);
        let mut cmd = Command::new("HSET").arg(key.as_str());
        let fields: BTreeMap<&String, &MetadataValue> = doc.metadata.iter().collect();
        for (field, value) in fields {
            let separator = schema
                .and_then(|s| s.tag_field(field))
                .map_or(DEFAULT_TAG_SEPARATOR, TagField::separator);
            match value.to_field_bytes_with(separator) {
                Some(bytes) => {
                    cmd.push_arg(field.as_str());
                    cmd.push_arg(bytes);
                }
                None => log::debug!("Skipping null metadata field '{field}' of {key}"),
            }
        }
        (key, cmd)
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Embed `query` and return the `k` closest documents.
    ///
    /// `k` of 0 uses `default_k` from the configuration.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        options: SearchOptions,
    ) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_total(query, k, options)
            .await?
            .documents)
    }

    /// Like [`similarity_search`](Self::similarity_search), also returning
    /// the total match count reported by the engine.
    pub async fn similarity_search_with_total(
        &self,
        query: &str,
        k: usize,
        options: SearchOptions,
    ) -> Result<SearchResults> {
        let threshold = options.validated_threshold()?;
        let filter = options.validated_filter()?;
        let embedder = options
            .embedder
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.embedder));
        let vector = embedder.embed_query(query).await?;
        self.search(VectorData::F32(vector), k, threshold, filter, &options)
            .await
    }

    /// Return the `k` documents closest to `vector`.
    pub async fn similarity_search_by_vector(
        &self,
        vector: impl Into<VectorData>,
        k: usize,
        options: SearchOptions,
    ) -> Result<Vec<Document>> {
        let threshold = options.validated_threshold()?;
        let filter = options.validated_filter()?;
        Ok(self
            .search(vector.into(), k, threshold, filter, &options)
            .await?
            .documents)
    }

    async fn search(
        &self,
        vector: VectorData,
        k: usize,
        threshold: f32,
        filter: Option<String>,
        options: &SearchOptions,
    ) -> Result<SearchResults> {
        let k = if k == 0 { self.config.default_k } else { k };
        let schema = self.schema.read().await.clone();
        let vector = match schema.as_ref().and_then(|s| s.vector_field(&self.keys.vector)) {
            Some(field) if !vector.is_empty() => conform_vector(field, vector)?,
            _ => vector,
        };

        let mut request = SearchRequest::new(self.index_name(), vector)
            .with_vector_key(self.keys.vector.as_str())
            .with_distance_alias(self.keys.distance.as_str())
            .with_score_threshold(threshold)
            .with_offset_limit(options.offset, k);
        if let Some(filter) = filter {
            request = request.with_pre_filter(filter);
        }
        if let Some(sort_by) = &options.sort_by {
            request = request.with_sort_by(sort_by.clone());
        }
        if let Some(schema) = &schema {
            let mut returns = schema.metadata_keys(&self.keys.vector);
            returns.retain(|f| *f != self.keys.distance);
            if !returns.contains(&self.keys.content) {
                returns.push(self.keys.content.clone());
            }
            request = request.with_returns(returns);
        }

        let cmd = request.to_command()?;
        log::debug!(
            "Searching '{}' ({} mode, k={k})",
            self.index_name(),
            if request.is_range() { "range" } else { "knn" }
        );
        let reply = self.executor.execute(cmd).await?;
        decode_search_reply(reply, &self.keys, schema.as_ref())
    }
}

impl std::fmt::Debug for RedisVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisVectorStore")
            .field("index_name", &self.config.index_name)
            .field("prefix", &self.prefix)
            .field("executor", &self.executor.name())
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

/// Check `vector` against the schema's vector field and convert it to the
/// field's datatype.
fn conform_vector(field: &VectorField, vector: VectorData) -> Result<VectorData> {
    let expected = field.effective_dims();
    if vector.len() != expected {
        return Err(Error::VectorDimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector.into_datatype(field.datatype))
}

/// Key for a document: `<prefix>:<ids>`, `<prefix>:<keys>` or
/// `<prefix>:<uuid v4>`.
fn document_key(prefix: &str, metadata: &Metadata) -> String {
    let id = ["ids", "keys"]
        .iter()
        .find_map(|k| metadata.get(*k).and_then(MetadataValue::to_field_string));
    match id {
        Some(id) => format!("{prefix}:{id}"),
        None => format!("{prefix}:{}", uuid::Uuid::new_v4()),
    }
}

// ============================================================================
// Tests
// ============================================================================
