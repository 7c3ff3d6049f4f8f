//! Schema generation.
//!
//! Two independent producers of an [`IndexSchema`]:
//!
//! - [`SchemaSource::generate`] parses a JSON or YAML schema document, given
//!   inline or as a file path.
//! - [`infer_schema`] derives a schema from one example metadata mapping.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::VectorData;
use crate::error::{Error, Result};
use crate::metadata::{Metadata, MetadataValue};
use crate::schema::{
    DistanceMetric, IndexSchema, NumericField, TagField, TextField, VectorAlgorithm, VectorField,
};

// ============================================================================
// Declarative schemas
// ============================================================================

/// Schema document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    /// JSON document.
    Json,
    /// YAML document.
    #[default]
    Yaml,
}

impl SchemaFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

impl std::str::FromStr for SchemaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::config(format!("unknown schema format: {other}"))),
        }
    }
}

/// Where a declarative schema comes from.
///
/// Inline content wins over the path when both are set.
#[derive(Debug, Clone, Default)]
pub struct SchemaSource {
    format: SchemaFormat,
    path: Option<PathBuf>,
    content: Option<Vec<u8>>,
}

impl SchemaSource {
    /// Read the schema from a file.
    pub fn from_file(format: SchemaFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: Some(path.into()),
            content: None,
        }
    }

    /// Read the schema from a file, inferring the format from its extension
    /// (YAML when unknown).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SchemaFormat::from_path(&path).unwrap_or_default();
        Self::from_file(format, path)
    }

    /// Use inline schema content.
    pub fn from_bytes(format: SchemaFormat, content: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            path: None,
            content: Some(content.into()),
        }
    }

    /// The document format.
    pub fn format(&self) -> SchemaFormat {
        self.format
    }

    /// Parse the schema.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySchemaContent`] when neither source yields bytes
    /// - [`Error::IoWithPath`] when the file cannot be read
    /// - [`Error::SchemaParse`] on malformed documents
    /// - [`Error::DuplicateField`] when field names repeat
    pub fn generate(&self) -> Result<IndexSchema> {
        let content = match (&self.content, &self.path) {
            (Some(bytes), _) if !bytes.is_empty() => bytes.clone(),
            (_, Some(path)) if !path.as_os_str().is_empty() => {
                std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?
            }
            _ => return Err(Error::EmptySchemaContent),
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::EmptySchemaContent);
        }

        let schema: IndexSchema = match self.format {
            SchemaFormat::Json => serde_json::from_slice(&content)
                .map_err(|e| Error::schema_parse(self.format, e))?,
            SchemaFormat::Yaml => yaml_serde::from_slice(&content)
                .map_err(|e| Error::schema_parse(self.format, e))?,
        };
        schema.validate()?;

        log::debug!(
            "Loaded {} schema with {} fields ({} vector)",
            self.format,
            schema.len(),
            schema.vector.len()
        );
        Ok(schema)
    }
}

// ============================================================================
// Inference
// ============================================================================

/// Infer a schema from one example metadata mapping.
///
/// `vector_key` names the reserved embedding field. Keys are visited in
/// sorted order so the same mapping always yields the same schema.
///
/// | Value | Field |
/// |-------|-------|
/// | vector at `vector_key` | FLAT cosine `VECTOR`, dims = length |
/// | `String` | `TEXT`, weight 1 |
/// | `Integer` / `Float` | `NUMERIC` |
/// | `List`, or `Vector` elsewhere | `TAG` with `,` separator |
/// | `Null`, `Bool`, `Map` | skipped with a warning |
///
/// # Errors
///
/// [`Error::InvalidVectorType`] when `vector_key` holds anything but an
/// f32/f64 vector.
pub fn infer_schema(metadata: &Metadata, vector_key: &str) -> Result<IndexSchema> {
    let mut keys: Vec<&String> = metadata.keys().collect();
    keys.sort();

    let mut schema = IndexSchema::new();
    for key in keys {
        let value = &metadata[key];

        if key == vector_key {
            let MetadataValue::Vector(vector) = value else {
                return Err(Error::InvalidVectorType(key.clone()));
            };
            schema.vector.push(default_vector_field(key, vector));
            continue;
        }

        match value {
            MetadataValue::String(_) => schema.text.push(TextField::new(key.as_str())),
            MetadataValue::Integer(_) | MetadataValue::Float(_) => {
                schema.numeric.push(NumericField::new(key.as_str()));
            }
            MetadataValue::List(_) | MetadataValue::Vector(_) => {
                schema.tag.push(TagField::new(key.as_str()).with_separator(","));
            }
            MetadataValue::Null => {
                log::warn!("Ignoring nil metadata value for key '{key}'");
            }
            MetadataValue::Bool(_) | MetadataValue::Map(_) => {
                log::warn!(
                    "Ignoring metadata key '{key}' with unsupported {} value",
                    value.type_name()
                );
            }
        }
    }
    Ok(schema)
}

fn default_vector_field(name: &str, vector: &VectorData) -> VectorField {
    VectorField {
        name: name.to_string(),
        algorithm: VectorAlgorithm::Flat,
        dims: vector.len(),
        datatype: vector.datatype(),
        distance_metric: DistanceMetric::Cosine,
        ..Default::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::VectorDataType;
    use std::collections::BTreeMap;
    use std::io::Write;

    const YAML_SCHEMA: &str = r#"
text:
  - name: content
  - name: title
    weight: 2
    no_stem: true
numeric:
  - name: year
    sortable: true
vector:
  - name: content_vector
    algorithm: HNSW
    dims: 384
    distance_metric: IP
    m: 16
"#;

    const JSON_SCHEMA: &str = r#"{
  "tag": [{"name": "genre", "separator": "|"}],
  "text": [{"name": "content"}],
  "vector": [{"name": "content_vector", "dims": 1536, "distance_metric": "COSINE"}]
}"#;

    #[test]
    fn test_generate_from_yaml_bytes() {
        let schema = SchemaSource::from_bytes(SchemaFormat::Yaml, YAML_SCHEMA)
            .generate()
            .unwrap();
        assert_eq!(schema.text.len(), 2);
        assert_eq!(schema.text[1].weight, Some(2.0));
        assert!(schema.text[1].no_stem);
        assert_eq!(schema.numeric.len(), 1);
        assert!(schema.tag.is_empty());
        let vector = &schema.vector[0];
        assert_eq!(vector.algorithm, VectorAlgorithm::Hnsw);
        assert_eq!(vector.dims, 384);
        assert_eq!(vector.distance_metric, DistanceMetric::Ip);
        assert_eq!(vector.m, 16);
    }

    #[test]
    fn test_generate_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON_SCHEMA.as_bytes()).unwrap();

        let source = SchemaSource::from_path(file.path());
        assert_eq!(source.format(), SchemaFormat::Json);
        let schema = source.generate().unwrap();
        assert_eq!(schema.tag[0].separator(), "|");
        assert_eq!(schema.vector[0].algorithm, VectorAlgorithm::Flat);
        assert_eq!(schema.vector[0].dims, 1536);
        assert!(schema.numeric.is_empty());
    }

    #[test]
    fn test_generate_testdata_schemas() {
        for file in ["testdata/schema.yml", "testdata/schema.json"] {
            let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(file);
            let schema = SchemaSource::from_path(path).generate().unwrap();
            assert_eq!(schema.vector.len(), 1, "{file}");
            assert_eq!(schema.vector[0].algorithm, VectorAlgorithm::Flat);
            assert_eq!(schema.vector[0].dims, 1536);
            assert_eq!(schema.vector[0].distance_metric, DistanceMetric::Cosine);
            assert!(schema.tag.is_empty());
            assert_eq!(schema.text.len(), 4);
            assert_eq!(schema.numeric.len(), 1);
        }
    }

    #[test]
    fn test_inline_content_wins_over_path() {
        let source = SchemaSource {
            format: SchemaFormat::Json,
            path: Some(PathBuf::from("/definitely/not/here.json")),
            content: Some(JSON_SCHEMA.as_bytes().to_vec()),
        };
        assert!(source.generate().is_ok());
    }

    #[test]
    fn test_empty_content_error() {
        let err = SchemaSource::default().generate().unwrap_err();
        assert!(matches!(err, Error::EmptySchemaContent));

        let err = SchemaSource::from_bytes(SchemaFormat::Yaml, "  \n")
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::EmptySchemaContent));

        let err = SchemaSource::from_file(SchemaFormat::Yaml, "")
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::EmptySchemaContent));
    }

    #[test]
    fn test_missing_file_error() {
        let err = SchemaSource::from_file(SchemaFormat::Yaml, "./testdata/not_exists.yml")
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::IoWithPath { .. }));
    }

    #[test]
    fn test_malformed_documents() {
        let err = SchemaSource::from_bytes(SchemaFormat::Json, "{not json")
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaParse { ref format, .. } if format == "json"));

        let err = SchemaSource::from_bytes(SchemaFormat::Yaml, "text: [name: : :")
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaParse { .. }));
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let doc = r#"{"text": [{"name": "a"}], "numeric": [{"name": "a"}]}"#;
        let err = SchemaSource::from_bytes(SchemaFormat::Json, doc)
            .generate()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateField(_)));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("YML".parse::<SchemaFormat>().unwrap(), SchemaFormat::Yaml);
        assert_eq!("json".parse::<SchemaFormat>().unwrap(), SchemaFormat::Json);
        assert!("toml".parse::<SchemaFormat>().is_err());
        assert_eq!(SchemaFormat::from_path(Path::new("a/b.YAML")), Some(SchemaFormat::Yaml));
        assert_eq!(SchemaFormat::from_path(Path::new("schema")), None);
    }

    // ------------------------------------------------------------------------
    // Inference
    // ------------------------------------------------------------------------

    #[test]
    fn test_infer_one_field_per_category() {
        let metadata: Metadata = [
            ("title".to_string(), MetadataValue::from("x")),
            ("area".to_string(), MetadataValue::from(100i64)),
            (
                "tags".to_string(),
                MetadataValue::List(vec![1i64.into(), 2i64.into()]),
            ),
            ("vec".to_string(), MetadataValue::from(vec![0.1f32, 0.2])),
            ("skip".to_string(), MetadataValue::Null),
        ]
        .into_iter()
        .collect();

        let schema = infer_schema(&metadata, "vec").unwrap();
        assert_eq!(schema.text.len(), 1);
        assert_eq!(schema.text[0].name, "title");
        assert_eq!(schema.text[0].weight, Some(1.0));
        assert_eq!(schema.numeric.len(), 1);
        assert_eq!(schema.numeric[0].name, "area");
        assert_eq!(schema.tag.len(), 1);
        assert_eq!(schema.tag[0].name, "tags");
        assert_eq!(schema.tag[0].separator(), ",");
        assert_eq!(schema.vector.len(), 1);
        assert_eq!(schema.vector[0].name, "vec");
        assert_eq!(schema.vector[0].dims, 2);
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_infer_mixed_sample() {
        let metadata: Metadata = [
            ("population".to_string(), MetadataValue::from(38.2)),
            ("area".to_string(), MetadataValue::from(2190i64)),
            ("content".to_string(), MetadataValue::from("foo")),
            ("content_vector".to_string(), MetadataValue::from(vec![0.1f32])),
            ("tag".to_string(), MetadataValue::List(vec![1i64.into()])),
            ("ignore".to_string(), MetadataValue::Null),
            ("ignore_other_type".to_string(), MetadataValue::Map(BTreeMap::new())),
            ("flag".to_string(), MetadataValue::Bool(true)),
        ]
        .into_iter()
        .collect();

        let schema = infer_schema(&metadata, "content_vector").unwrap();
        assert_eq!(schema.vector.len(), 1);
        assert_eq!(schema.vector[0].algorithm, VectorAlgorithm::Flat);
        assert_eq!(schema.vector[0].dims, 1);
        assert_eq!(schema.tag.len(), 1);
        assert_eq!(schema.text.len(), 1);
        assert_eq!(schema.numeric.len(), 2);
        // Sorted key order.
        assert_eq!(schema.numeric[0].name, "area");
        assert_eq!(schema.numeric[1].name, "population");
    }

    #[test]
    fn test_infer_f64_vector_keeps_datatype() {
        let metadata: Metadata =
            [("content_vector".to_string(), MetadataValue::from(vec![0.1f64, 0.2, 0.3]))]
                .into_iter()
                .collect();
        let schema = infer_schema(&metadata, "content_vector").unwrap();
        assert_eq!(schema.vector[0].datatype, VectorDataType::Float64);
        assert_eq!(schema.vector[0].dims, 3);
    }

    #[test]
    fn test_infer_rejects_non_vector_at_vector_key() {
        let metadata: Metadata = [(
            "content_vector".to_string(),
            MetadataValue::List(vec![0.1f64.into()]),
        )]
        .into_iter()
        .collect();
        let err = infer_schema(&metadata, "content_vector").unwrap_err();
        assert!(matches!(err, Error::InvalidVectorType(key) if key == "content_vector"));
    }

    #[test]
    fn test_infer_vector_elsewhere_is_tag() {
        let metadata: Metadata = [("other".to_string(), MetadataValue::from(vec![1.0f32]))]
            .into_iter()
            .collect();
        let schema = infer_schema(&metadata, "content_vector").unwrap();
        assert_eq!(schema.tag.len(), 1);
        assert!(schema.vector.is_empty());
    }

    #[test]
    fn test_infer_is_deterministic() {
        let metadata: Metadata = (0..20)
            .map(|i| (format!("k{i:02}"), MetadataValue::from(i as i64)))
            .collect();
        let a = infer_schema(&metadata, "v").unwrap().to_tokens();
        let b = infer_schema(&metadata, "v").unwrap().to_tokens();
        assert_eq!(a, b);
        assert_eq!(a[0], "k00");
    }
}
