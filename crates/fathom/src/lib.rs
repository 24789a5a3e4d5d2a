//! Fathom search DSL: umbrella crate.
//!
//! Re-exports the schema model, the query DSL and, behind feature flags, the
//! backend adapters.

#![doc = include_str!("../README.md")]

pub use fathom_core as core;
pub use fathom_query as query;

#[cfg(feature = "tantivy")]
pub use fathom_tantivy as tantivy;

#[cfg(feature = "elastic")]
pub use fathom_elastic as elastic;

pub use fathom_core::{Error, Result};

/// Types needed to declare indexes and run queries.
pub mod prelude {
    pub use fathom_core::{
        AnalysisRegistry, BooleanOperator, DistanceUnit, Error, FailedLoadPolicy, FieldDescriptor,
        FieldValue, GeoPoint, IndexSchema, ObjectStructure, QueryConfig, Result, SchemaRegistry,
        SortOrder,
    };
    pub use fathom_query::{
        BackendAdapter, EntityLoader, MapEntityLoader, PredicateFinalStep, ProjectionValue,
        SearchPredicate, SearchProjection, SearchQuery, SearchResult, SearchScope, SearchSort,
        SessionContext, SimpleQueryFlags,
    };

    #[cfg(feature = "tantivy")]
    pub use fathom_tantivy::{Document, Indexer, NestedObject, TantivyBackend};

    #[cfg(feature = "elastic")]
    pub use fathom_elastic::{ElasticBackend, Routing, Transport};

    #[cfg(feature = "http")]
    pub use fathom_elastic::HttpTransport;
}
