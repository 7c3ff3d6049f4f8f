//! Handler functions for schema and index CLI commands.
//!
//! `schema compile` works offline and only prints the `FT.CREATE` command.
//! `index {exists,create,drop}` run against the configured server through
//! any [`CommandExecutor`].

use fabryk_redis::{
    CommandExecutor, Error, IndexDefinition, RedisStoreConfig, Result, SchemaSource, StorageKind,
    index,
};

/// Inputs shared by `schema compile` and `index create`.
#[derive(Debug, Default, Clone)]
pub struct DefinitionOptions {
    /// Schema document path; the configured `schema_path` when `None`.
    pub schema: Option<String>,
    /// Index name override.
    pub index: Option<String>,
    /// Key prefixes; `[config.prefix()]` when empty.
    pub prefixes: Vec<String>,
    /// Storage kind override, as typed on the command line.
    pub storage: Option<String>,
}

/// Build an [`IndexDefinition`] from the config and command-line overrides.
pub fn build_definition(
    config: &RedisStoreConfig,
    options: DefinitionOptions,
) -> Result<IndexDefinition> {
    let mut config = config.clone();
    if let Some(name) = options.index {
        config.index_name = name;
    }
    if let Some(path) = options.schema {
        config.schema_path = Some(path.into());
    }

    let source: SchemaSource = config
        .schema_source()
        .ok_or_else(|| Error::config("no schema document given (use --schema)"))?;
    let schema = source.generate()?;

    let storage = match options.storage.as_deref() {
        Some(kind) => kind.parse::<StorageKind>()?,
        None => config.storage,
    };
    let prefixes = if options.prefixes.is_empty() {
        vec![config.prefix()]
    } else {
        options.prefixes
    };

    Ok(IndexDefinition::new(
        config.index_name,
        prefixes,
        storage,
        schema,
    ))
}

/// `schema compile`: the `FT.CREATE` command as one line.
pub fn handle_schema_compile(config: &RedisStoreConfig, options: DefinitionOptions) -> Result<String> {
    let command = build_definition(config, options)?.to_command()?;
    Ok(command.to_string())
}

/// `index exists`.
pub async fn handle_index_exists(executor: &dyn CommandExecutor, name: &str) -> Result<bool> {
    index::index_exists(executor, name).await
}

/// `index create`: create the index unless it exists. Returns whether it was
/// created.
pub async fn handle_index_create(
    executor: &dyn CommandExecutor,
    definition: &IndexDefinition,
) -> Result<bool> {
    if index::index_exists(executor, definition.name()).await? {
        log::info!("Index '{}' already exists", definition.name());
        return Ok(false);
    }
    index::create_index(executor, definition).await?;
    Ok(true)
}

/// `index drop`.
pub async fn handle_index_drop(
    executor: &dyn CommandExecutor,
    name: &str,
    delete_documents: bool,
) -> Result<()> {
    index::drop_index(executor, name, delete_documents).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fabryk_redis::MockExecutor;

    const SCHEMA: &str = "\
tag:
  - name: genre
text:
  - name: content
vector:
  - name: content_vector
    algorithm: FLAT
    dims: 3
    distance_metric: COSINE
";

    fn schema_file() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yml");
        std::fs::write(&path, SCHEMA).unwrap();
        let path = path.to_string_lossy().to_string();
        (dir, path)
    }

    fn options(schema: &str) -> DefinitionOptions {
        DefinitionOptions {
            schema: Some(schema.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_uses_config_defaults() {
        let (_dir, path) = schema_file();
        let line =
            handle_schema_compile(&RedisStoreConfig::new("movies"), options(&path)).unwrap();
        assert!(line.starts_with("FT.CREATE movies ON HASH PREFIX 1 doc:movies SCORE 1.0 SCHEMA"));
        assert!(line.contains("content_vector VECTOR FLAT 6 TYPE FLOAT32 DIM 3"));
    }

    #[test]
    fn test_compile_overrides() {
        let (_dir, path) = schema_file();
        let opts = DefinitionOptions {
            index: Some("films".into()),
            prefixes: vec!["a:".into(), "b:".into()],
            storage: Some("json".into()),
            ..options(&path)
        };
        let line = handle_schema_compile(&RedisStoreConfig::new("movies"), opts).unwrap();
        assert!(line.starts_with("FT.CREATE films ON JSON PREFIX 2 a: b: SCORE 1.0 SCHEMA"));
    }

    #[test]
    fn test_compile_requires_schema() {
        let err = handle_schema_compile(&RedisStoreConfig::new("movies"), DefinitionOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_compile_rejects_bad_storage() {
        let (_dir, path) = schema_file();
        let opts = DefinitionOptions {
            storage: Some("XML".into()),
            ..options(&path)
        };
        let err = handle_schema_compile(&RedisStoreConfig::new("movies"), opts).unwrap_err();
        assert!(matches!(err, Error::InvalidStorageKind(_)));
    }

    #[test]
    fn test_compile_requires_index_name() {
        let (_dir, path) = schema_file();
        let err = handle_schema_compile(&RedisStoreConfig::default(), options(&path)).unwrap_err();
        assert!(matches!(err, Error::EmptyIndexName));
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let (_dir, path) = schema_file();
        let mock = MockExecutor::new();
        let definition = build_definition(&RedisStoreConfig::new("movies"), options(&path)).unwrap();

        assert!(!handle_index_exists(&mock, "movies").await.unwrap());
        assert!(handle_index_create(&mock, &definition).await.unwrap());
        assert!(!handle_index_create(&mock, &definition).await.unwrap());
        assert!(handle_index_exists(&mock, "movies").await.unwrap());
        assert_eq!(mock.count("FT.CREATE").await, 1);

        handle_index_drop(&mock, "movies", true).await.unwrap();
        assert!(!mock.has_index("movies").await);
        let err = handle_index_drop(&mock, "movies", false).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)));
    }
}
