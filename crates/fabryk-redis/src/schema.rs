//! Typed RediSearch index schema.
//!
//! Each field variant knows how to render itself as the token sequence that
//! follows `SCHEMA` in an `FT.CREATE` command. [`IndexSchema`] holds the
//! fields in four ordered lists and always renders them Tag, Text, Numeric,
//! Vector, in that order.
//!
//! Schemas deserialize from JSON or YAML documents shaped like:
//!
//! ```yaml
//! text:
//!   - name: content
//!   - name: title
//!     weight: 2
//! numeric:
//!   - name: year
//!     sortable: true
//! vector:
//!   - name: content_vector
//!     algorithm: HNSW
//!     dims: 384
//!     distance_metric: COSINE
//! ```
//!
//! Unrecognized enum values fall back to the engine defaults (`FLAT`,
//! `FLOAT32`, `COSINE`) rather than failing the parse.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default tag separator.
pub const DEFAULT_TAG_SEPARATOR: &str = ",";

/// Dimension emitted when a vector field has none configured.
pub const DEFAULT_VECTOR_DIMS: usize = 128;

// ============================================================================
// Enums
// ============================================================================

/// Vector index algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "UPPERCASE")]
pub enum VectorAlgorithm {
    /// Brute-force exact search.
    #[default]
    Flat,
    /// Hierarchical navigable small world graph.
    Hnsw,
}

impl VectorAlgorithm {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Hnsw => "HNSW",
        }
    }
}

impl From<String> for VectorAlgorithm {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("HNSW") {
            Self::Hnsw
        } else {
            Self::Flat
        }
    }
}

/// Vector element datatype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "UPPERCASE")]
pub enum VectorDataType {
    /// 32-bit float.
    #[default]
    Float32,
    /// 64-bit float.
    Float64,
}

impl VectorDataType {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
        }
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

impl From<String> for VectorDataType {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("FLOAT64") {
            Self::Float64
        } else {
            Self::Float32
        }
    }
}

/// Vector distance metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum DistanceMetric {
    /// Euclidean distance.
    #[serde(rename = "L2")]
    L2,
    /// Cosine distance.
    #[default]
    #[serde(rename = "COSINE")]
    Cosine,
    /// Inner product.
    #[serde(rename = "IP")]
    Ip,
}

impl DistanceMetric {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "L2",
            Self::Cosine => "COSINE",
            Self::Ip => "IP",
        }
    }
}

impl From<String> for DistanceMetric {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "L2" => Self::L2,
            "IP" => Self::Ip,
            _ => Self::Cosine,
        }
    }
}

/// Phonetic matchers accepted by `TEXT ... PHONETIC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneticMatcher {
    /// Double Metaphone, English.
    English,
    /// Double Metaphone, French.
    French,
    /// Double Metaphone, Portuguese.
    Portuguese,
    /// Double Metaphone, Spanish.
    Spanish,
}

impl PhoneticMatcher {
    /// Parse a matcher code such as `dm:en`.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "dm:en" => Some(Self::English),
            "dm:fr" => Some(Self::French),
            "dm:pt" => Some(Self::Portuguese),
            "dm:es" => Some(Self::Spanish),
            _ => None,
        }
    }

    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "dm:en",
            Self::French => "dm:fr",
            Self::Portuguese => "dm:pt",
            Self::Spanish => "dm:es",
        }
    }
}

/// The four field variants, used to type values read back from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `TAG`
    Tag,
    /// `TEXT`
    Text,
    /// `NUMERIC`
    Numeric,
    /// `VECTOR`
    Vector,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tag => "TAG",
            Self::Text => "TEXT",
            Self::Numeric => "NUMERIC",
            Self::Vector => "VECTOR",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Field trait
// ============================================================================

/// A field that can be rendered into `FT.CREATE ... SCHEMA` tokens.
pub trait SchemaField {
    /// The field (attribute) name.
    fn name(&self) -> &str;

    /// Render the field as command tokens.
    fn to_tokens(&self) -> Vec<String>;
}

/// `<name> [AS <alias>] <kind>`
fn head_tokens(name: &str, alias: Option<&str>, kind: &str) -> Vec<String> {
    let mut tokens = vec![name.to_string()];
    if let Some(alias) = alias.filter(|a| !a.is_empty()) {
        tokens.push("AS".to_string());
        tokens.push(alias.to_string());
    }
    tokens.push(kind.to_string());
    tokens
}

fn push_flag(tokens: &mut Vec<String>, enabled: bool, flag: &str) {
    if enabled {
        tokens.push(flag.to_string());
    }
}

// ============================================================================
// Tag
// ============================================================================

/// A `TAG` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagField {
    /// Field name.
    pub name: String,

    /// Optional alias.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Tag separator (defaults to `,`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    /// Do not index the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_index: bool,

    /// Allow sorting on the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sortable: bool,

    /// Keep the original letter case.
    #[serde(default, skip_serializing_if = "is_false")]
    pub case_sensitive: bool,
}

impl TagField {
    /// Create a tag field with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// The effective separator.
    pub fn separator(&self) -> &str {
        match self.separator.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_TAG_SEPARATOR,
        }
    }
}

impl SchemaField for TagField {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_tokens(&self) -> Vec<String> {
        let mut tokens = head_tokens(&self.name, self.alias.as_deref(), "TAG");
        tokens.push(self.separator().to_string());
        push_flag(&mut tokens, self.case_sensitive, "CASESENSITIVE");
        push_flag(&mut tokens, self.no_index, "NOINDEX");
        push_flag(&mut tokens, self.sortable, "SORTABLE");
        tokens
    }
}

// ============================================================================
// Text
// ============================================================================

/// A `TEXT` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    /// Field name.
    pub name: String,

    /// Optional alias.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Relevance weight; 1 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,

    /// Disable stemming.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_stem: bool,

    /// Keep a suffix trie for contains/suffix queries.
    #[serde(default, alias = "with_suffixtrie", skip_serializing_if = "is_false")]
    pub withsuffixtrie: bool,

    /// Phonetic matcher code (`dm:en`, `dm:fr`, `dm:pt`, `dm:es`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_matcher: Option<String>,

    /// Do not index the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_index: bool,

    /// Allow sorting on the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sortable: bool,
}

impl TextField {
    /// Create a text field with weight 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: Some(1.0),
            ..Default::default()
        }
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl SchemaField for TextField {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_tokens(&self) -> Vec<String> {
        let mut tokens = head_tokens(&self.name, self.alias.as_deref(), "TEXT");
        if let Some(weight) = self.weight.filter(|w| *w != 0.0 && *w != 1.0) {
            tokens.push("WEIGHT".to_string());
            tokens.push(weight.to_string());
        }
        if let Some(matcher) = self.phonetic_matcher.as_deref().and_then(PhoneticMatcher::parse) {
            tokens.push("PHONETIC".to_string());
            tokens.push(matcher.as_str().to_string());
        }
        push_flag(&mut tokens, self.withsuffixtrie, "WITHSUFFIXTRIE");
        push_flag(&mut tokens, self.no_stem, "NOSTEM");
        push_flag(&mut tokens, self.no_index, "NOINDEX");
        push_flag(&mut tokens, self.sortable, "SORTABLE");
        tokens
    }
}

// ============================================================================
// Numeric
// ============================================================================

/// A `NUMERIC` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericField {
    /// Field name.
    pub name: String,

    /// Optional alias.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Do not index the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_index: bool,

    /// Allow sorting on the field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sortable: bool,
}

impl NumericField {
    /// Create a numeric field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl SchemaField for NumericField {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_tokens(&self) -> Vec<String> {
        let mut tokens = head_tokens(&self.name, self.alias.as_deref(), "NUMERIC");
        push_flag(&mut tokens, self.no_index, "NOINDEX");
        push_flag(&mut tokens, self.sortable, "SORTABLE");
        tokens
    }
}

// ============================================================================
// Vector
// ============================================================================

/// A `VECTOR` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorField {
    /// Field name.
    pub name: String,

    /// Optional alias.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Index algorithm.
    #[serde(default)]
    pub algorithm: VectorAlgorithm,

    /// Vector dimension (128 when zero).
    #[serde(default)]
    pub dims: usize,

    /// Element datatype.
    #[serde(default)]
    pub datatype: VectorDataType,

    /// Distance metric.
    #[serde(default)]
    pub distance_metric: DistanceMetric,

    /// Initial vector capacity. Read from schema documents but never sent
    /// to the engine.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub initial_cap: usize,

    /// FLAT block size.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub block_size: usize,

    /// HNSW max outgoing edges per node.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub m: usize,

    /// HNSW construction breadth.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ef_construction: usize,

    /// HNSW query breadth.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ef_runtime: usize,

    /// HNSW range-query boundary factor.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub epsilon: f32,
}

impl VectorField {
    /// Create a FLAT cosine float32 vector field.
    pub fn flat(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            dims,
            ..Default::default()
        }
    }

    /// Create an HNSW cosine float32 vector field.
    pub fn hnsw(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            algorithm: VectorAlgorithm::Hnsw,
            dims,
            ..Default::default()
        }
    }

    /// Set the datatype.
    pub fn with_datatype(mut self, datatype: VectorDataType) -> Self {
        self.datatype = datatype;
        self
    }

    /// Set the distance metric.
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// The dimension sent to the engine.
    pub fn effective_dims(&self) -> usize {
        if self.dims > 0 {
            self.dims
        } else {
            DEFAULT_VECTOR_DIMS
        }
    }

    /// The `(name, value)` attribute pairs in emission order.
    fn attributes(&self) -> Vec<(&'static str, String)> {
        let dims = self.effective_dims();
        let mut attrs = vec![
            ("TYPE", self.datatype.as_str().to_string()),
            ("DIM", dims.to_string()),
            ("DISTANCE_METRIC", self.distance_metric.as_str().to_string()),
        ];
        match self.algorithm {
            VectorAlgorithm::Flat => {
                if self.block_size > 0 {
                    attrs.push(("BLOCK_SIZE", self.block_size.to_string()));
                }
            }
            VectorAlgorithm::Hnsw => {
                if self.m > 0 {
                    attrs.push(("M", self.m.to_string()));
                }
                if self.ef_construction > 0 {
                    attrs.push(("EF_CONSTRUCTION", self.ef_construction.to_string()));
                }
                if self.ef_runtime > 0 {
                    attrs.push(("EF_RUNTIME", self.ef_runtime.to_string()));
                }
                if self.epsilon > 0.0 {
                    attrs.push(("EPSILON", self.epsilon.to_string()));
                }
            }
        }
        attrs
    }
}

impl SchemaField for VectorField {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_tokens(&self) -> Vec<String> {
        let attrs = self.attributes();
        let mut tokens = head_tokens(&self.name, self.alias.as_deref(), "VECTOR");
        tokens.push(self.algorithm.as_str().to_string());
        // Count of tokens that follow, two per attribute.
        tokens.push((attrs.len() * 2).to_string());
        for (key, value) in attrs {
            tokens.push(key.to_string());
            tokens.push(value);
        }
        tokens
    }
}

// ============================================================================
// IndexSchema
// ============================================================================

/// Ordered collection of schema fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Tag fields.
    #[serde(default)]
    pub tag: Vec<TagField>,

    /// Text fields.
    #[serde(default)]
    pub text: Vec<TextField>,

    /// Numeric fields.
    #[serde(default)]
    pub numeric: Vec<NumericField>,

    /// Vector fields.
    #[serde(default)]
    pub vector: Vec<VectorField>,
}

impl IndexSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag field.
    pub fn with_tag(mut self, field: TagField) -> Self {
        self.tag.push(field);
        self
    }

    /// Add a text field.
    pub fn with_text(mut self, field: TextField) -> Self {
        self.text.push(field);
        self
    }

    /// Add a numeric field.
    pub fn with_numeric(mut self, field: NumericField) -> Self {
        self.numeric.push(field);
        self
    }

    /// Add a vector field.
    pub fn with_vector(mut self, field: VectorField) -> Self {
        self.vector.push(field);
        self
    }

    /// Total number of fields.
    pub fn len(&self) -> usize {
        self.tag.len() + self.text.len() + self.numeric.len() + self.vector.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All field names with their kind, in rendering order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        let tags = self.tag.iter().map(|f| (f.name.as_str(), FieldKind::Tag));
        let texts = self.text.iter().map(|f| (f.name.as_str(), FieldKind::Text));
        let numerics = self
            .numeric
            .iter()
            .map(|f| (f.name.as_str(), FieldKind::Numeric));
        let vectors = self
            .vector
            .iter()
            .map(|f| (f.name.as_str(), FieldKind::Vector));
        tags.chain(texts).chain(numerics).chain(vectors)
    }

    /// Kind of the named field.
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields().find(|(n, _)| *n == name).map(|(_, k)| k)
    }

    /// Tag field by name.
    pub fn tag_field(&self, name: &str) -> Option<&TagField> {
        self.tag.iter().find(|f| f.name == name)
    }

    /// Vector field by name.
    pub fn vector_field(&self, name: &str) -> Option<&VectorField> {
        self.vector.iter().find(|f| f.name == name)
    }

    /// Names of the fields that carry metadata, excluding the vector key.
    pub fn metadata_keys(&self, vector_key: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.fields()
            .filter(|(name, _)| *name != vector_key)
            .filter(|(name, _)| seen.insert(*name))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Check that field names are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, _) in self.fields() {
            if !seen.insert(name) {
                return Err(Error::DuplicateField(name.to_string()));
            }
        }
        Ok(())
    }

    /// Render every field, Tag, Text, Numeric, then Vector.
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for field in &self.tag {
            tokens.extend(field.to_tokens());
        }
        for field in &self.text {
            tokens.extend(field.to_tokens());
        }
        for field in &self.numeric {
            tokens.extend(field.to_tokens());
        }
        for field in &self.vector {
            tokens.extend(field.to_tokens());
        }
        tokens
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_zero_f32(n: &f32) -> bool {
    *n == 0.0
}

// ============================================================================
// Tests
// ============================================================================
