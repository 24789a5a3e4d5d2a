//! Minimal write path.
//!
//! Indexing is outside the query engine's concerns; this module only exists
//! so applications and tests can put documents into a [`TantivyBackend`]
//! without touching the physical schema.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fathom_tantivy::{Document, TantivyBackend};
//!
//! let backend = TantivyBackend::new(&registry)?;
//! let mut indexer = backend.indexer()?;
//! indexer.add_document(
//!     &Document::new("books", "1")
//!         .field("title", "Panda breeding")
//!         .field("year", 2001),
//! )?;
//! indexer.commit()?;
//! ```
//!
//! Each [`NestedObject`] becomes a hidden document of its own, linked to the
//! document holding it. Its values are also copied into every ancestor, so
//! flat predicates, sorts and projections see them as multi-valued fields.
//!
//! [`TantivyBackend`]: crate::TantivyBackend

use std::sync::Arc;

use fathom_core::{Error, FieldValue, Result};
use tantivy::{IndexReader, IndexWriter, TantivyDocument};

use crate::backend::tantivy_error;
use crate::schema::{PhysicalSchema, document_key, object_key};

/// Index writer buffer size (50MB).
pub(crate) const WRITER_BUFFER_SIZE: usize = 50_000_000;

/// A document of one logical index.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    index: String,
    id: String,
    tenant_id: Option<String>,
    fields: Vec<(String, FieldValue)>,
    objects: Vec<(String, NestedObject)>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            tenant_id: None,
            fields: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Assigns the document to a tenant.
    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Adds a value; call again with the same path for multi-valued fields.
    pub fn field(mut self, path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((path.into(), value.into()));
        self
    }

    /// Adds one object to the nested object field at `path`; call again with
    /// the same path for every object of the field.
    pub fn nested(mut self, path: impl Into<String>, object: NestedObject) -> Self {
        self.objects.push((path.into(), object));
        self
    }

    /// Logical index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Document identifier.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One object of a nested object field.
///
/// Paths are relative to the object: `first` under `authors` is the logical
/// field `authors.first`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedObject {
    fields: Vec<(String, FieldValue)>,
    objects: Vec<(String, NestedObject)>,
}

impl NestedObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value at a path relative to this object.
    pub fn field(mut self, path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((path.into(), value.into()));
        self
    }

    /// Adds an object to a nested object field of this object.
    pub fn nested(mut self, path: impl Into<String>, object: NestedObject) -> Self {
        self.objects.push((path.into(), object));
        self
    }
}

/// Tantivy index writer wrapper.
///
/// Documents become searchable once [`Indexer::commit`] returns.
pub struct Indexer {
    writer: IndexWriter,
    reader: IndexReader,
    schema: Arc<PhysicalSchema>,
}

impl Indexer {
    pub(crate) fn new(writer: IndexWriter, reader: IndexReader, schema: Arc<PhysicalSchema>) -> Self {
        Self {
            writer,
            reader,
            schema,
        }
    }

    /// Stages a document and its nested objects, encoding every value with
    /// its field codec.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        for tantivy_doc in self.convert_to_tantivy_docs(doc)? {
            self.writer
                .add_document(tantivy_doc)
                .map_err(|e| tantivy_error("failed to add document", e))?;
        }
        Ok(())
    }

    /// Commits staged documents and refreshes the searcher.
    pub fn commit(&mut self) -> Result<()> {
        let opstamp = self
            .writer
            .commit()
            .map_err(|e| tantivy_error("failed to commit index", e))?;
        self.reader
            .reload()
            .map_err(|e| tantivy_error("failed to reload index reader", e))?;
        log::debug!("Committed index at opstamp {opstamp}");
        Ok(())
    }

    /// Deletes every document of every logical index.
    pub fn clear(&mut self) -> Result<()> {
        self.writer
            .delete_all_documents()
            .map_err(|e| tantivy_error("failed to clear index", e))?;
        self.commit()
    }

    /// Converts a document into its root Tantivy document followed by one
    /// document per nested object.
    fn convert_to_tantivy_docs(&self, doc: &Document) -> Result<Vec<TantivyDocument>> {
        let s = &self.schema;
        if !s.has_index(&doc.index) {
            return Err(Error::UnknownIndex {
                name: doc.index.clone(),
            });
        }

        let key = document_key(&doc.index, &doc.id);
        let mut root = TantivyDocument::new();
        root.add_text(s.index_field(), &doc.index);
        root.add_text(s.id_field(), &doc.id);
        root.add_text(s.join_fields().key, &key);
        if let Some(tenant_id) = &doc.tenant_id {
            root.add_text(s.tenant_field(), tenant_id);
        }
        for (path, value) in &doc.fields {
            self.add_value(&mut root, &doc.index, path, value)?;
        }

        let mut objects = Vec::new();
        let mut ordinal = 0;
        for (path, object) in &doc.objects {
            let values =
                self.convert_object(&doc.index, &key, path, object, &mut ordinal, &mut objects)?;
            for (path, value) in &values {
                self.add_value(&mut root, &doc.index, path, value)?;
            }
        }

        let mut docs = Vec::with_capacity(objects.len() + 1);
        docs.push(root);
        docs.extend(objects);
        Ok(docs)
    }

    /// Converts `object` and its own nested objects into hidden documents.
    ///
    /// Returns every value of the subtree keyed by absolute path, for the
    /// caller to copy into its own document.
    fn convert_object(
        &self,
        index: &str,
        parent: &str,
        path: &str,
        object: &NestedObject,
        ordinal: &mut usize,
        out: &mut Vec<TantivyDocument>,
    ) -> Result<Vec<(String, FieldValue)>> {
        let s = &self.schema;
        if !s.is_nested(index, path) {
            return Err(Error::invalid_argument(format!(
                "'{path}' is not a nested object field of index '{index}'"
            )));
        }
        *ordinal += 1;
        let key = object_key(parent, path, *ordinal);

        let mut values: Vec<(String, FieldValue)> = object
            .fields
            .iter()
            .map(|(name, value)| (format!("{path}.{name}"), value.clone()))
            .collect();
        for (name, child) in &object.objects {
            let child_path = format!("{path}.{name}");
            values.extend(self.convert_object(index, &key, &child_path, child, ordinal, out)?);
        }

        let join = s.join_fields();
        let mut tantivy_doc = TantivyDocument::new();
        tantivy_doc.add_text(join.key, &key);
        tantivy_doc.add_text(join.parent, parent);
        tantivy_doc.add_text(join.nested, path);
        for (path, value) in &values {
            self.add_value(&mut tantivy_doc, index, path, value)?;
        }
        out.push(tantivy_doc);
        Ok(values)
    }

    fn add_value(
        &self,
        tantivy_doc: &mut TantivyDocument,
        index: &str,
        path: &str,
        value: &FieldValue,
    ) -> Result<()> {
        let physical = self
            .schema
            .field(index, path)
            .ok_or_else(|| Error::unknown_field(path, &[index.to_string()]))?;
        let encoded = physical
            .codec
            .encode(value)
            .map_err(|reason| Error::invalid_value(path, reason))?;
        let field = physical.field;
        match encoded {
            FieldValue::String(text) => tantivy_doc.add_text(field, &text),
            FieldValue::Long(v) => tantivy_doc.add_i64(field, v),
            FieldValue::Double(v) => tantivy_doc.add_f64(field, v),
            FieldValue::Boolean(v) => tantivy_doc.add_bool(field, v),
            FieldValue::GeoPoint(p) => tantivy_doc.add_text(field, p.to_string()),
            FieldValue::Null => {}
        }
        Ok(())
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("schema", &self.schema)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
