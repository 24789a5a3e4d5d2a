//! Entity loading contract.
//!
//! Hits reference documents; turning them into application entities is the
//! job of an [`EntityLoader`]. During extraction every hit plans its loads on
//! a [`LoadingContext`], which deduplicates them. Once the page is extracted
//! the context resolves every planned reference in one batch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fathom_core::{Error, Result};

/// Identifies a document in a logical index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentReference {
    /// Index name.
    pub index: String,
    /// Document identifier.
    pub id: String,
}

impl DocumentReference {
    /// Creates a reference.
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.id)
    }
}

/// Identifies an entity by type name and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// Entity type name.
    pub type_name: String,
    /// Entity identifier.
    pub id: String,
}

/// Loads entities for document references, in batches.
#[async_trait]
pub trait EntityLoader<E>: Send + Sync {
    /// Loads one entity per reference, in the same order.
    ///
    /// A `None` entry means the entity could not be loaded (deleted, hidden).
    /// Returning a list of another length is a contract violation.
    async fn load(&self, references: &[DocumentReference]) -> Result<Vec<Option<E>>>;

    /// The entity reference of a document; by default the index name is the
    /// entity type name.
    fn entity_reference(&self, reference: &DocumentReference) -> EntityReference {
        EntityReference {
            type_name: reference.index.clone(),
            id: reference.id.clone(),
        }
    }
}

/// Opaque handle of a planned load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadingKey(usize);

/// Collects the loads planned by one query execution.
#[derive(Debug, Default)]
pub struct LoadingContext {
    references: Vec<DocumentReference>,
    keys: HashMap<DocumentReference, LoadingKey>,
}

impl LoadingContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans the load of `reference`; planning twice returns the same key.
    pub fn plan_loading(&mut self, reference: &DocumentReference) -> LoadingKey {
        if let Some(key) = self.keys.get(reference) {
            return *key;
        }
        let key = LoadingKey(self.references.len());
        self.references.push(reference.clone());
        self.keys.insert(reference.clone(), key);
        key
    }

    /// Number of distinct planned loads.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether nothing was planned.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Resolves every planned load with a single loader call.
    pub async fn resolve<E, L>(self, loader: &L) -> Result<LoadingResult<E>>
    where
        L: EntityLoader<E> + ?Sized,
    {
        if self.references.is_empty() {
            return Ok(LoadingResult {
                entities: Vec::new(),
            });
        }
        let entities = loader.load(&self.references).await?;
        if entities.len() != self.references.len() {
            return Err(Error::loading(format!(
                "loader returned {} entities for {} references",
                entities.len(),
                self.references.len()
            )));
        }
        let failed = entities.iter().filter(|e| e.is_none()).count();
        if failed > 0 {
            log::debug!(
                "{failed} of {} entities could not be loaded",
                self.references.len()
            );
        }
        Ok(LoadingResult { entities })
    }
}

/// Entities resolved by a [`LoadingContext`].
#[derive(Debug)]
pub struct LoadingResult<E> {
    entities: Vec<Option<E>>,
}

impl<E> LoadingResult<E> {
    /// The entity of a planned load, `None` if it failed to load.
    pub fn get(&self, key: LoadingKey) -> Option<&E> {
        self.entities.get(key.0).and_then(Option::as_ref)
    }
}

/// An in-memory loader backed by a map, mostly useful in tests and demos.
#[derive(Debug)]
pub struct MapEntityLoader<E> {
    entities: HashMap<DocumentReference, E>,
    batches: AtomicUsize,
}

impl<E> Default for MapEntityLoader<E> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            batches: AtomicUsize::new(0),
        }
    }
}

impl<E> MapEntityLoader<E> {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity of a document.
    pub fn with_entity(mut self, index: &str, id: &str, entity: E) -> Self {
        self.entities.insert(DocumentReference::new(index, id), entity);
        self
    }

    /// Number of `load` calls so far.
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<E> EntityLoader<E> for MapEntityLoader<E>
where
    E: Clone + Send + Sync,
{
    async fn load(&self, references: &[DocumentReference]) -> Result<Vec<Option<E>>> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(references
            .iter()
            .map(|r| self.entities.get(r).cloned())
            .collect())
    }
}
