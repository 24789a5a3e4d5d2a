//! Tantivy backend for Fathom.
//!
//! [`TantivyBackend`] implements [`fathom_query::BackendAdapter`] over an
//! embedded, in-memory Tantivy index. It is the reference backend: the
//! analyzers of the registry become Tantivy tokenizer pipelines, so text is
//! analyzed the same way at index time and at query time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      fathom-tantivy                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TantivyBackend (BackendAdapter)                            │
//! │  ├── PhysicalSchema (<index>/<path> fields, _index, _id)    │
//! │  ├── Analyzers (registry analyzers → TextAnalyzer)          │
//! │  └── Indexer (write path for applications and tests)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  compile: predicate nodes → Box<dyn Query>                  │
//! │  sort: TantivySort, post-collection ordering                │
//! │  collect: Count + TopDocs on a blocking task                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fathom_query::{PredicateFinalStep, SearchScope};
//! use fathom_tantivy::{Document, TantivyBackend};
//!
//! let backend = Arc::new(TantivyBackend::new(&registry)?);
//! let mut indexer = backend.indexer()?;
//! indexer.add_document(&Document::new("books", "1").field("title", "Giant panda"))?;
//! indexer.commit()?;
//!
//! let scope = SearchScope::new(backend, &registry, &["books"], Arc::new(QueryConfig::default()))?;
//! let result = scope
//!     .query(loader)
//!     .select_entity_reference()
//!     .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())?
//!     .fetch()
//!     .await?;
//! ```
//!
//! # Limitations
//!
//! Nested predicates join object documents back to their holders while the
//! query's weight is built, which runs the inner query once per search.
//! Field and distance sorts load every matching document before paginating.

pub mod analysis;
pub mod backend;
mod collect;
pub mod compile;
pub mod indexer;
mod nested;
pub mod schema;
pub mod sort;

// Re-exports
pub use analysis::{AnalyzedToken, Analyzers};
pub use backend::{BACKEND_NAME, TantivyBackend};
pub use compile::TantivyQuery;
pub use indexer::{Document, Indexer, NestedObject};
pub use schema::{JoinFields, PhysicalField, PhysicalSchema};
pub use sort::{SortKey, TantivySort};
