//! Field Metadata Registry.
//!
//! Index schemas are declared once at bootstrap and never change afterwards.
//! The [`SchemaRegistry`] validates them against the analysis registry and
//! is shared read-only by every query through [`FieldMetadataProvider`].
//!
//! # Example
//!
//! ```rust
//! use fathom_core::{AnalysisRegistry, FieldDescriptor, IndexSchema, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new(AnalysisRegistry::default())
//!     .with_index(
//!         IndexSchema::new("books")
//!             .with_field("title", FieldDescriptor::text("standard_english"))
//!             .with_field("isbn", FieldDescriptor::keyword())
//!             .with_field("year", FieldDescriptor::long()),
//!     )
//!     .unwrap();
//! assert!(registry.index("books").is_some());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::analysis::{AnalysisRegistry, DEFAULT_ANALYZER};
use crate::error::{Error, Result};
use crate::value::FieldValue;

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Character data.
    String,
    /// Signed 64-bit integers.
    Long,
    /// Floating point numbers.
    Double,
    /// Booleans.
    Boolean,
    /// Geographic points.
    GeoPoint,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "String",
            ValueType::Long => "Long",
            ValueType::Double => "Double",
            ValueType::Boolean => "Boolean",
            ValueType::GeoPoint => "GeoPoint",
        };
        f.write_str(name)
    }
}

/// How a field's values are represented in the index.
///
/// Two fields holding the same [`ValueType`] are still incompatible when their
/// codecs differ, e.g. an analyzed text field and a keyword field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCodec {
    /// Analyzed full text.
    Text,
    /// A single exact term, optionally normalized.
    Keyword,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// Float rounded to a fixed number of decimals.
    ScaledNumber {
        /// Number of decimals kept.
        decimal_scale: u8,
    },
    /// Boolean.
    Boolean,
    /// Latitude/longitude pair.
    GeoPoint,
}

impl FieldCodec {
    /// The value type this codec encodes.
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldCodec::Text | FieldCodec::Keyword => ValueType::String,
            FieldCodec::Long => ValueType::Long,
            FieldCodec::Double | FieldCodec::ScaledNumber { .. } => ValueType::Double,
            FieldCodec::Boolean => ValueType::Boolean,
            FieldCodec::GeoPoint => ValueType::GeoPoint,
        }
    }

    /// Whether values of this codec are character data.
    pub fn is_text_like(&self) -> bool {
        self.value_type() == ValueType::String
    }

    /// Whether values go through an analyzer.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, FieldCodec::Text)
    }

    /// Converts a DSL value into the value stored in the index.
    ///
    /// Returns the reason on failure so callers can attach the field path.
    pub fn encode(&self, value: &FieldValue) -> std::result::Result<FieldValue, String> {
        if value.is_null() {
            return Err("must be non-null".to_string());
        }
        let mismatch = || format!("expected a {} value, got a {}", self.value_type(), value.kind());
        match self {
            FieldCodec::Text | FieldCodec::Keyword => {
                value.as_str().map(FieldValue::from).ok_or_else(mismatch)
            }
            FieldCodec::Long => value.as_i64().map(FieldValue::Long).ok_or_else(mismatch),
            FieldCodec::Double => value.as_f64().map(FieldValue::Double).ok_or_else(mismatch),
            FieldCodec::ScaledNumber { decimal_scale } => {
                let factor = 10f64.powi(i32::from(*decimal_scale));
                value
                    .as_f64()
                    .map(|v| FieldValue::Double((v * factor).round() / factor))
                    .ok_or_else(mismatch)
            }
            FieldCodec::Boolean => value.as_bool().map(FieldValue::Boolean).ok_or_else(mismatch),
            FieldCodec::GeoPoint => {
                let point = value.as_geo_point().ok_or_else(mismatch)?;
                if point.is_valid() {
                    Ok(FieldValue::GeoPoint(point))
                } else {
                    Err(format!("coordinates out of range: {}", value))
                }
            }
        }
    }
}

impl fmt::Display for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCodec::Text => write!(f, "Text"),
            FieldCodec::Keyword => write!(f, "Keyword"),
            FieldCodec::Long => write!(f, "Long"),
            FieldCodec::Double => write!(f, "Double"),
            FieldCodec::ScaledNumber { decimal_scale } => {
                write!(f, "ScaledNumber({decimal_scale})")
            }
            FieldCodec::Boolean => write!(f, "Boolean"),
            FieldCodec::GeoPoint => write!(f, "GeoPoint"),
        }
    }
}

/// Per-index metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    codec: FieldCodec,
    searchable: bool,
    sortable: bool,
    projectable: bool,
    analyzer: Option<String>,
    search_analyzer: Option<String>,
    normalizer: Option<String>,
}

impl FieldDescriptor {
    fn with_codec(codec: FieldCodec) -> Self {
        Self {
            codec,
            searchable: true,
            sortable: !codec.is_analyzed(),
            projectable: true,
            analyzer: None,
            search_analyzer: None,
            normalizer: None,
        }
    }

    /// An analyzed text field.
    pub fn text(analyzer: impl Into<String>) -> Self {
        let mut descriptor = Self::with_codec(FieldCodec::Text);
        descriptor.analyzer = Some(analyzer.into());
        descriptor
    }

    /// A keyword field without normalizer.
    pub fn keyword() -> Self {
        Self::with_codec(FieldCodec::Keyword)
    }

    /// A long field.
    pub fn long() -> Self {
        Self::with_codec(FieldCodec::Long)
    }

    /// A double field.
    pub fn double() -> Self {
        Self::with_codec(FieldCodec::Double)
    }

    /// A double field rounded to `decimal_scale` decimals.
    pub fn scaled_number(decimal_scale: u8) -> Self {
        Self::with_codec(FieldCodec::ScaledNumber { decimal_scale })
    }

    /// A boolean field.
    pub fn boolean() -> Self {
        Self::with_codec(FieldCodec::Boolean)
    }

    /// A geo point field.
    pub fn geo_point() -> Self {
        Self::with_codec(FieldCodec::GeoPoint)
    }

    /// Sets the analyzer applied to query text instead of the write analyzer.
    pub fn with_search_analyzer(mut self, name: impl Into<String>) -> Self {
        self.search_analyzer = Some(name.into());
        self
    }

    /// Sets the normalizer of a keyword field.
    pub fn with_normalizer(mut self, name: impl Into<String>) -> Self {
        self.normalizer = Some(name.into());
        self
    }

    /// Enables or disables predicates on this field.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Enables or disables sorts on this field.
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Enables or disables projections on this field.
    pub fn projectable(mut self, projectable: bool) -> Self {
        self.projectable = projectable;
        self
    }

    /// The codec.
    pub fn codec(&self) -> FieldCodec {
        self.codec
    }

    /// The value type.
    pub fn value_type(&self) -> ValueType {
        self.codec.value_type()
    }

    /// Whether predicates are allowed.
    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    /// Whether sorts are allowed.
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    /// Whether projections are allowed.
    pub fn is_projectable(&self) -> bool {
        self.projectable
    }

    /// The write analyzer.
    pub fn analyzer(&self) -> Option<&str> {
        self.analyzer.as_deref()
    }

    /// The analyzer applied to query text: the search analyzer if declared,
    /// else the write analyzer.
    pub fn effective_search_analyzer(&self) -> Option<&str> {
        self.search_analyzer.as_deref().or(self.analyzer.as_deref())
    }

    /// The normalizer.
    pub fn normalizer(&self) -> Option<&str> {
        self.normalizer.as_deref()
    }
}

/// Structure of an object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStructure {
    /// Sub-fields are merged into the parent document.
    Flattened,
    /// Each object is indexed as its own hidden document.
    Nested,
}

/// The declared schema of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    name: String,
    fields: BTreeMap<String, FieldDescriptor>,
    objects: BTreeMap<String, ObjectStructure>,
}

impl IndexSchema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Declares a field at an absolute dotted path.
    pub fn with_field(mut self, path: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(path.into(), descriptor);
        self
    }

    /// Declares an object field.
    pub fn with_object(mut self, path: impl Into<String>, structure: ObjectStructure) -> Self {
        self.objects.insert(path.into(), structure);
        self
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field.
    pub fn field(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.get(path)
    }

    /// All fields, sorted by path.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up an object field.
    pub fn object(&self, path: &str) -> Option<ObjectStructure> {
        self.objects.get(path).copied()
    }

    /// All object fields, sorted by path.
    pub fn objects(&self) -> impl Iterator<Item = (&str, ObjectStructure)> {
        self.objects.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Read access to per-index field metadata.
///
/// Implementations must be immutable once handed out: scopes resolved from
/// them are cached by callers.
pub trait FieldMetadataProvider: Send + Sync {
    /// Whether the index is known.
    fn has_index(&self, index: &str) -> bool;

    /// Field paths declared by the index.
    fn field_paths(&self, index: &str) -> Vec<String>;

    /// Field metadata of `path` in `index`.
    fn field(&self, index: &str, path: &str) -> Option<&FieldDescriptor>;

    /// Object structure of `path` in `index`, if it is an object field.
    fn object_structure(&self, index: &str, path: &str) -> Option<ObjectStructure>;

    /// The analysis chains referenced by the fields.
    fn analysis(&self) -> Arc<AnalysisRegistry>;
}

/// Registry of every index schema known to the application.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    analysis: Arc<AnalysisRegistry>,
    indexes: BTreeMap<String, IndexSchema>,
}

impl SchemaRegistry {
    /// Creates a registry with no indexes.
    pub fn new(analysis: AnalysisRegistry) -> Self {
        Self {
            analysis: Arc::new(analysis),
            indexes: BTreeMap::new(),
        }
    }

    /// Adds an index schema, checking that every analyzer and normalizer it
    /// names is registered.
    pub fn with_index(mut self, schema: IndexSchema) -> Result<Self> {
        for (path, field) in schema.fields() {
            for analyzer in [field.analyzer(), field.search_analyzer.as_deref()]
                .into_iter()
                .flatten()
            {
                if self.analysis.analyzer(analyzer).is_none() {
                    return Err(Error::config(format!(
                        "field '{path}' of index '{}' references unknown analyzer '{analyzer}'",
                        schema.name()
                    )));
                }
            }
            if let Some(normalizer) = field.normalizer()
                && self.analysis.normalizer(normalizer).is_none()
            {
                return Err(Error::config(format!(
                    "field '{path}' of index '{}' references unknown normalizer '{normalizer}'",
                    schema.name()
                )));
            }
            if field.codec() == FieldCodec::Text && field.analyzer().is_none() {
                return Err(Error::config(format!(
                    "text field '{path}' of index '{}' has no analyzer; use '{DEFAULT_ANALYZER}'",
                    schema.name()
                )));
            }
        }
        if self.indexes.contains_key(schema.name()) {
            return Err(Error::config(format!(
                "index '{}' is already registered",
                schema.name()
            )));
        }
        log::debug!(
            "Registered index '{}' with {} fields",
            schema.name(),
            schema.fields.len()
        );
        self.indexes.insert(schema.name().to_string(), schema);
        Ok(self)
    }

    /// Looks up an index schema.
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.get(name)
    }

    /// All index schemas, sorted by name.
    pub fn indexes(&self) -> impl Iterator<Item = &IndexSchema> {
        self.indexes.values()
    }

    /// Names of all registered indexes.
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }
}

impl FieldMetadataProvider for SchemaRegistry {
    fn has_index(&self, index: &str) -> bool {
        self.indexes.contains_key(index)
    }

    fn field_paths(&self, index: &str) -> Vec<String> {
        self.indexes
            .get(index)
            .map(|schema| schema.fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn field(&self, index: &str, path: &str) -> Option<&FieldDescriptor> {
        self.indexes.get(index).and_then(|schema| schema.field(path))
    }

    fn object_structure(&self, index: &str, path: &str) -> Option<ObjectStructure> {
        self.indexes.get(index).and_then(|schema| schema.object(path))
    }

    fn analysis(&self) -> Arc<AnalysisRegistry> {
        Arc::clone(&self.analysis)
    }
}

// ============================================================================
// Tests
// ============================================================================
