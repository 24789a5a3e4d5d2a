//! Physical Tantivy schema hosting every logical index.
//!
//! One Tantivy index holds the documents of all registered indexes. Each
//! (index, path) pair gets its own physical field named `<index>/<path>`, so
//! two indexes may declare the same path with different types or analyzers.
//! Hidden fields identify documents and join nested objects to the
//! document holding them:
//!
//! - `_index`: logical index name (STRING | STORED)
//! - `_id`: document identifier (STRING | STORED)
//! - `_tenant`: tenant identifier, if any (STRING | STORED)
//! - `_key`: unique key of a root or nested object document (STRING)
//! - `_parent`: key of the document holding a nested object (STRING | STORED)
//! - `_nested`: object path of a nested object document (STRING)
//!
//! Nested object documents carry no `_index`, so index-scoped queries never
//! return them.

use std::collections::{HashMap, HashSet};

use fathom_core::{DEFAULT_ANALYZER, FieldCodec, FieldContext, ObjectStructure, SchemaRegistry};
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, SchemaBuilder,
    TextFieldIndexing, TextOptions,
};

use crate::analysis::{analyzer_tokenizer_name, normalizer_tokenizer_name};

/// Hidden field holding the logical index name.
pub const INDEX_FIELD: &str = "_index";
/// Hidden field holding the document identifier.
pub const ID_FIELD: &str = "_id";
/// Hidden field holding the tenant identifier.
pub const TENANT_FIELD: &str = "_tenant";
/// Hidden field holding the key of a root or nested object document.
pub const KEY_FIELD: &str = "_key";
/// Hidden field holding the key of the document holding a nested object.
pub const PARENT_FIELD: &str = "_parent";
/// Hidden field holding the object path of a nested object document.
pub const NESTED_FIELD: &str = "_nested";

const KEY_SEPARATOR: char = '\u{1f}';

/// A physical field and the codec of its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalField {
    /// Tantivy field.
    pub field: Field,
    /// Codec declared for the logical field.
    pub codec: FieldCodec,
}

/// The Tantivy schema plus the logical → physical field mapping.
#[derive(Clone)]
pub struct PhysicalSchema {
    schema: Schema,
    index: Field,
    id: Field,
    tenant: Field,
    join: JoinFields,
    fields: HashMap<String, HashMap<String, PhysicalField>>,
    nested: HashMap<String, HashSet<String>>,
}

/// Hidden fields joining nested object documents to their holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinFields {
    /// The `_key` field.
    pub key: Field,
    /// The `_parent` field.
    pub parent: Field,
    /// The `_nested` field.
    pub nested: Field,
}

impl PhysicalSchema {
    /// Builds the physical schema of every index in `registry`.
    pub fn build(registry: &SchemaRegistry) -> Self {
        let mut builder = SchemaBuilder::new();

        let index = builder.add_text_field(INDEX_FIELD, STRING | STORED);
        let id = builder.add_text_field(ID_FIELD, STRING | STORED);
        let tenant = builder.add_text_field(TENANT_FIELD, STRING | STORED);
        let join = JoinFields {
            key: builder.add_text_field(KEY_FIELD, STRING),
            parent: builder.add_text_field(PARENT_FIELD, STRING | STORED),
            nested: builder.add_text_field(NESTED_FIELD, STRING),
        };

        let mut fields: HashMap<String, HashMap<String, PhysicalField>> = HashMap::new();
        let mut nested: HashMap<String, HashSet<String>> = HashMap::new();
        for schema in registry.indexes() {
            let objects = schema
                .objects()
                .filter(|(_, structure)| *structure == ObjectStructure::Nested)
                .map(|(path, _)| path.to_string())
                .collect();
            nested.insert(schema.name().to_string(), objects);
            let per_index = fields.entry(schema.name().to_string()).or_default();
            for (path, descriptor) in schema.fields() {
                let name = physical_name(schema.name(), path);
                let codec = descriptor.codec();
                let field = match codec {
                    FieldCodec::Text => {
                        let analyzer = descriptor.analyzer().unwrap_or(DEFAULT_ANALYZER);
                        builder.add_text_field(
                            &name,
                            text_options(&analyzer_tokenizer_name(analyzer), true),
                        )
                    }
                    FieldCodec::Keyword => builder.add_text_field(
                        &name,
                        text_options(&normalizer_tokenizer_name(descriptor.normalizer()), false),
                    ),
                    FieldCodec::Long => builder.add_i64_field(&name, numeric_options()),
                    FieldCodec::Double | FieldCodec::ScaledNumber { .. } => {
                        builder.add_f64_field(&name, numeric_options())
                    }
                    FieldCodec::Boolean => builder.add_bool_field(&name, numeric_options()),
                    // Stored as "lat,lon"; distances are computed from stored values.
                    FieldCodec::GeoPoint => builder.add_text_field(&name, STORED),
                };
                per_index.insert(path.to_string(), PhysicalField { field, codec });
            }
        }

        let schema = builder.build();
        log::debug!(
            "Built physical schema with {} fields for {} indexes",
            schema.num_fields(),
            fields.len()
        );
        Self {
            schema,
            index,
            id,
            tenant,
            join,
            fields,
            nested,
        }
    }

    /// The Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The `_index` field.
    pub fn index_field(&self) -> Field {
        self.index
    }

    /// The `_id` field.
    pub fn id_field(&self) -> Field {
        self.id
    }

    /// The `_tenant` field.
    pub fn tenant_field(&self) -> Field {
        self.tenant
    }

    /// The hidden fields joining nested objects to their holders.
    pub fn join_fields(&self) -> JoinFields {
        self.join
    }

    /// Whether `path` is declared as a nested object of `index`.
    pub fn is_nested(&self, index: &str, path: &str) -> bool {
        self.nested
            .get(index)
            .is_some_and(|paths| paths.contains(path))
    }

    /// Whether `index` is hosted by this schema.
    pub fn has_index(&self, index: &str) -> bool {
        self.fields.contains_key(index)
    }

    /// The physical field of `path` in `index`.
    pub fn field(&self, index: &str, path: &str) -> Option<PhysicalField> {
        self.fields.get(index)?.get(path).copied()
    }

    /// The physical fields of a logical field, one per declaring index, in
    /// scope order.
    pub fn fields_of(&self, context: &FieldContext) -> Vec<PhysicalField> {
        context
            .members()
            .iter()
            .filter_map(|m| self.field(&m.index, context.path()))
            .collect()
    }
}

impl std::fmt::Debug for PhysicalSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalSchema")
            .field("field_count", &self.schema.num_fields())
            .field("index_count", &self.fields.len())
            .finish()
    }
}

/// Physical field name of `path` in `index`.
pub fn physical_name(index: &str, path: &str) -> String {
    format!("{index}/{path}")
}

/// `_key` of the root document `id` of `index`.
pub fn document_key(index: &str, id: &str) -> String {
    format!("{index}{KEY_SEPARATOR}{id}")
}

/// `_key` of the `ordinal`-th nested object at `path` under `parent`.
pub fn object_key(parent: &str, path: &str, ordinal: usize) -> String {
    format!("{parent}{KEY_SEPARATOR}{path}{KEY_SEPARATOR}{ordinal}")
}

fn text_options(tokenizer: &str, analyzed: bool) -> TextOptions {
    let record = if analyzed {
        IndexRecordOption::WithFreqsAndPositions
    } else {
        IndexRecordOption::Basic
    };
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(tokenizer)
                .set_index_option(record),
        )
        .set_stored()
}

fn numeric_options() -> NumericOptions {
    NumericOptions::default()
        .set_indexed()
        .set_fast()
        .set_stored()
}

// ============================================================================
// Tests
// ============================================================================
