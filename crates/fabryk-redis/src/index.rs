//! Index definition, `FT.CREATE` compilation and index administration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::schema::IndexSchema;

/// Key namespace used when no prefix is configured: `doc:<index>`.
pub fn key_prefix(index: &str) -> String {
    format!("doc:{index}")
}

/// Record storage kind the index covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StorageKind {
    /// Hash records.
    #[default]
    Hash,
    /// JSON documents.
    Json,
}

impl StorageKind {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Json => "JSON",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HASH" => Ok(Self::Hash),
            "JSON" => Ok(Self::Json),
            _ => Err(Error::InvalidStorageKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for StorageKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<StorageKind> for String {
    fn from(kind: StorageKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Everything needed to create a search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    name: String,
    prefixes: Vec<String>,
    storage: StorageKind,
    schema: IndexSchema,
}

impl IndexDefinition {
    /// Create a definition.
    pub fn new(
        name: impl Into<String>,
        prefixes: Vec<String>,
        storage: StorageKind,
        schema: IndexSchema,
    ) -> Self {
        Self {
            name: name.into(),
            prefixes,
            storage,
            schema,
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key prefixes covered by the index.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Storage kind.
    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    /// Field schema.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Compile to `FT.CREATE <name> ON <kind> [PREFIX <n> <p>...] SCORE 1.0
    /// SCHEMA <fields>`.
    pub fn to_command(&self) -> Result<Command> {
        if self.name.is_empty() {
            return Err(Error::EmptyIndexName);
        }

        let mut cmd = Command::new("FT.CREATE").arg(self.name.as_str());
        cmd.extend_args(["ON", self.storage.as_str()]);
        if !self.prefixes.is_empty() {
            cmd.push_arg("PREFIX");
            cmd.push_arg(self.prefixes.len().to_string());
            cmd.extend_args(self.prefixes.iter().map(String::as_str));
        }
        cmd.extend_args(["SCORE", "1.0", "SCHEMA"]);
        cmd.extend_args(self.schema.to_tokens());
        Ok(cmd)
    }
}

// ============================================================================
// Administration
// ============================================================================

/// Whether `name` exists, by `FT.INFO`.
///
/// Unknown-index replies map to `false`; any other error propagates. An
/// empty name never exists.
pub async fn index_exists(executor: &dyn CommandExecutor, name: &str) -> Result<bool> {
    if name.is_empty() {
        return Ok(false);
    }
    match executor.execute(Command::new("FT.INFO").arg(name)).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_unknown_index() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run `FT.CREATE` for `definition`.
///
/// An "already exists" reply becomes [`Error::IndexAlreadyExists`].
pub async fn create_index(executor: &dyn CommandExecutor, definition: &IndexDefinition) -> Result<()> {
    let name = definition.name();
    match executor.execute(definition.to_command()?).await {
        Ok(_) => {
            log::debug!(
                "Created index '{name}' with {} fields",
                definition.schema().len()
            );
            Ok(())
        }
        Err(e) if e.is_index_exists() => Err(Error::IndexAlreadyExists(name.to_string())),
        Err(e) => Err(e),
    }
}

/// Drop `name`; `DD` also deletes the indexed documents.
///
/// Fails with [`Error::IndexNotFound`] when the index does not exist.
pub async fn drop_index(
    executor: &dyn CommandExecutor,
    name: &str,
    delete_documents: bool,
) -> Result<()> {
    if !index_exists(executor, name).await? {
        return Err(Error::IndexNotFound(name.to_string()));
    }
    let mut cmd = Command::new("FT.DROPINDEX").arg(name);
    if delete_documents {
        cmd.push_arg("DD");
    }
    executor.execute(cmd).await?;
    log::debug!("Dropped index '{name}' (delete documents: {delete_documents})");
    Ok(())
}
