//! Search DSL and query orchestration for Fathom.
//!
//! This crate turns search intent into backend-native requests and turns raw
//! hits back into typed values. It knows nothing about any particular search
//! engine: backends implement [`BackendAdapter`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      fathom-query                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SearchScope (IndexScope + backend + QueryConfig)           │
//! │  ├── PredicateFactory → SearchPredicate (PredicateNode)     │
//! │  ├── SortFactory → SearchSort (SortNode)                    │
//! │  └── ProjectionFactory → SearchProjection (ProjectionNode)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SearchQueryBuilder ─build()→ SearchQuery ─fetch()→ result  │
//! │  ├── BackendAdapter (compile per kind, execute)             │
//! │  ├── ProjectionPlan (request → extract → transform)         │
//! │  └── LoadingContext → EntityLoader (batched loads)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fathom_query::{PredicateFinalStep, SearchScope};
//!
//! let scope = SearchScope::new(backend, &registry, &["books"], config)?;
//! let result = scope
//!     .query(loader)
//!     .select_entity()
//!     .predicate_with(|f| {
//!         f.simple_query_string()
//!             .field("title")?
//!             .boost(2.0)
//!             .field("summary")?
//!             .matching("\"giant panda\" | bamboo*")?
//!             .to_predicate()
//!     })?
//!     .sort_with(|s| Ok(s.score().to_sort()))?
//!     .limit(20)
//!     .fetch()
//!     .await?;
//! println!("{} hits", result.total_hit_count);
//! ```

pub mod backend;
pub mod loading;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod query_string;
pub mod session;
pub mod sort;

#[cfg(test)]
mod test_support;

// Re-exports
pub use backend::{BackendAdapter, HitRequirement, NativeSearchRequest, RawHit, RawSearchResult, RawValue};
pub use loading::{
    DocumentReference, EntityLoader, EntityReference, LoadingContext, LoadingKey, LoadingResult,
    MapEntityLoader,
};
pub use predicate::{
    AnalysisOverride, BoolClauses, FieldTarget, Fuzziness, PredicateFactory, PredicateFinalStep,
    PredicateKind, PredicateNode, PredicateOptions, RangeBound, SearchPredicate,
    effective_analyzer,
};
pub use projection::{ProjectionFactory, ProjectionNode, ProjectionPlan, ProjectionValue, SearchProjection};
pub use query::{SearchQuery, SearchQueryBuilder, SearchQuerySelectStep, SearchResult, SearchScope};
pub use query_string::{QueryStringNode, SimpleQueryFlags};
pub use session::{Capability, SessionContext};
pub use sort::{MissingValue, SearchSort, SortFactory, SortNode};
