//! Index Scope Resolver.
//!
//! An [`IndexScope`] is the set of indexes one query targets, together with
//! the merged metadata of every field those indexes declare. Merging never
//! fails by itself: incompatibilities are reported only when an operation
//! actually needs the conflicting attribute, because compatibility depends on
//! what the field is used for. A sort ignores analyzers, a text predicate does
//! not, and an analyzer override makes the declared analyzers irrelevant.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::analysis::AnalysisRegistry;
use crate::error::{Error, Result};
use crate::schema::{FieldCodec, FieldDescriptor, FieldMetadataProvider, ObjectStructure, ValueType};

/// The declaration of a field in one index of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMember {
    /// Index name.
    pub index: String,
    /// Field metadata in that index.
    pub descriptor: FieldDescriptor,
}

/// A field path resolved against every index of a scope that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    path: String,
    members: Vec<FieldMember>,
}

impl FieldContext {
    /// Builds a context from per-index declarations, in scope order.
    pub fn new(path: impl Into<String>, members: Vec<FieldMember>) -> Self {
        Self {
            path: path.into(),
            members,
        }
    }

    /// Absolute field path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declarations, one per index holding the field.
    pub fn members(&self) -> &[FieldMember] {
        &self.members
    }

    /// Names of the indexes holding the field.
    pub fn index_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.index.clone()).collect()
    }

    /// Declaration in a given index.
    pub fn descriptor_for(&self, index: &str) -> Option<&FieldDescriptor> {
        self.members
            .iter()
            .find(|m| m.index == index)
            .map(|m| &m.descriptor)
    }

    /// Whether the field is declared by more than one index.
    pub fn is_multi_index(&self) -> bool {
        self.members.len() > 1
    }

    /// The value of `attribute` shared by every member, if they agree.
    fn uniform<'a, T, F>(&'a self, attribute: F) -> Option<T>
    where
        T: PartialEq,
        F: Fn(&'a FieldDescriptor) -> T,
    {
        let mut values = self.members.iter().map(|m| attribute(&m.descriptor));
        let first = values.next()?;
        values.all(|v| v == first).then_some(first)
    }

    /// The shared codec.
    ///
    /// Fails with [`Error::FieldTypeConflict`] if indexes disagree on the
    /// type or the codec.
    pub fn codec(&self) -> Result<FieldCodec> {
        self.uniform(FieldDescriptor::codec)
            .ok_or_else(|| Error::FieldTypeConflict {
                path: self.path.clone(),
                indexes: self.index_names(),
            })
    }

    /// The shared value type.
    pub fn value_type(&self) -> Result<ValueType> {
        Ok(self.codec()?.value_type())
    }

    fn require<F>(&self, flag: F, error: fn(String, Vec<String>) -> Error) -> Result<()>
    where
        F: Fn(&FieldDescriptor) -> bool,
    {
        let failing: Vec<String> = self
            .members
            .iter()
            .filter(|m| !flag(&m.descriptor))
            .map(|m| m.index.clone())
            .collect();
        if failing.is_empty() {
            Ok(())
        } else {
            Err(error(self.path.clone(), failing))
        }
    }

    /// Fails with [`Error::NotSearchable`] unless every index allows predicates.
    pub fn require_searchable(&self) -> Result<()> {
        self.require(FieldDescriptor::is_searchable, |path, indexes| {
            Error::NotSearchable { path, indexes }
        })
    }

    /// Fails with [`Error::NotSortable`] unless every index allows sorts.
    pub fn require_sortable(&self) -> Result<()> {
        self.require(FieldDescriptor::is_sortable, |path, indexes| {
            Error::NotSortable { path, indexes }
        })
    }

    /// Fails with [`Error::NotProjectable`] unless every index allows projections.
    pub fn require_projectable(&self) -> Result<()> {
        self.require(FieldDescriptor::is_projectable, |path, indexes| {
            Error::NotProjectable { path, indexes }
        })
    }

    /// The analyzer applied to query text, shared by every index.
    ///
    /// Fails with [`Error::AnalyzerConflict`] if indexes disagree.
    pub fn search_analyzer(&self) -> Result<Option<&str>> {
        self.uniform(FieldDescriptor::effective_search_analyzer)
            .ok_or_else(|| Error::AnalyzerConflict {
                path: self.path.clone(),
                indexes: self.index_names(),
            })
    }

    /// The normalizer, shared by every index.
    ///
    /// Fails with [`Error::NormalizerConflict`] if indexes disagree.
    pub fn normalizer(&self) -> Result<Option<&str>> {
        self.uniform(FieldDescriptor::normalizer)
            .ok_or_else(|| Error::NormalizerConflict {
                path: self.path.clone(),
                indexes: self.index_names(),
            })
    }
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in [{}]", self.path, self.index_names().join(", "))
    }
}

/// The indexes targeted by one query and their reconciled field metadata.
///
/// Immutable once resolved; share it behind an [`Arc`] if several builders
/// need it.
#[derive(Debug, Clone)]
pub struct IndexScope {
    index_names: Vec<String>,
    fields: BTreeMap<String, Arc<FieldContext>>,
    objects: BTreeMap<String, Vec<(String, ObjectStructure)>>,
    analysis: Arc<AnalysisRegistry>,
}

impl IndexScope {
    /// Resolves a scope over `index_names`.
    ///
    /// Duplicate names are ignored; the first occurrence fixes the order.
    pub fn resolve<P, S>(provider: &P, index_names: &[S]) -> Result<Self>
    where
        P: FieldMetadataProvider + ?Sized,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::with_capacity(index_names.len());
        for name in index_names {
            let name = name.as_ref();
            if !provider.has_index(name) {
                return Err(Error::UnknownIndex {
                    name: name.to_string(),
                });
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(Error::invalid_argument(
                "an index scope needs at least one index",
            ));
        }

        let mut members: BTreeMap<String, Vec<FieldMember>> = BTreeMap::new();
        let mut objects: BTreeMap<String, Vec<(String, ObjectStructure)>> = BTreeMap::new();
        for index in &names {
            for path in provider.field_paths(index) {
                if let Some(descriptor) = provider.field(index, &path) {
                    members.entry(path.clone()).or_default().push(FieldMember {
                        index: index.clone(),
                        descriptor: descriptor.clone(),
                    });
                }
                for parent in parent_paths(&path) {
                    if let Some(structure) = provider.object_structure(index, parent) {
                        let entry = objects.entry(parent.to_string()).or_default();
                        if !entry.iter().any(|(i, _)| i == index) {
                            entry.push((index.clone(), structure));
                        }
                    }
                }
            }
        }

        let fields = members
            .into_iter()
            .map(|(path, members)| {
                let context = Arc::new(FieldContext::new(path.clone(), members));
                (path, context)
            })
            .collect::<BTreeMap<_, _>>();

        log::debug!(
            "Resolved index scope {:?} with {} fields",
            names,
            fields.len()
        );

        Ok(Self {
            index_names: names,
            fields,
            objects,
            analysis: provider.analysis(),
        })
    }

    /// Index names, in the order given at resolution.
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// The analysis registry shared by the scope's indexes.
    pub fn analysis(&self) -> &AnalysisRegistry {
        &self.analysis
    }

    /// Resolves a field path.
    ///
    /// Fails with [`Error::UnknownField`] if no index of the scope declares it.
    pub fn field(&self, path: &str) -> Result<&Arc<FieldContext>> {
        self.fields
            .get(path)
            .ok_or_else(|| Error::unknown_field(path, &self.index_names))
    }

    /// All resolved field paths, sorted.
    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Structure of an object path.
    ///
    /// Fails with [`Error::UnknownField`] if no index declares the object, and
    /// with [`Error::FieldTypeConflict`] if indexes disagree on its structure.
    pub fn object_structure(&self, path: &str) -> Result<ObjectStructure> {
        let declarations = self
            .objects
            .get(path)
            .ok_or_else(|| Error::unknown_field(path, &self.index_names))?;
        let first = declarations[0].1;
        if declarations.iter().all(|(_, s)| *s == first) {
            Ok(first)
        } else {
            Err(Error::FieldTypeConflict {
                path: path.to_string(),
                indexes: declarations.iter().map(|(i, _)| i.clone()).collect(),
            })
        }
    }

    /// Whether every index of this scope is among `declared`.
    ///
    /// Predicates, sorts and projections built for a scope may be used in a
    /// query over that scope or any narrower one.
    pub fn is_covered_by(&self, declared: &[String]) -> bool {
        self.index_names
            .iter()
            .all(|name| declared.iter().any(|d| d == name))
    }

    /// Fails with [`Error::IndexScopeMismatch`] unless `declared` covers this scope.
    pub fn check_covered_by(&self, kind: &str, declared: &[String]) -> Result<()> {
        if self.is_covered_by(declared) {
            Ok(())
        } else {
            Err(Error::IndexScopeMismatch {
                kind: kind.to_string(),
                declared: declared.to_vec(),
                requested: self.index_names.clone(),
            })
        }
    }
}

/// Proper ancestors of a dotted path, outermost first.
fn parent_paths(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.').map(move |(i, _)| &path[..i])
}

// ============================================================================
// Tests
// ============================================================================
