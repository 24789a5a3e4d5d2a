//! Core types for Fathom.
//!
//! This crate holds everything a search query needs to know about the indexes
//! it targets, independently of the DSL and of any search engine:
//!
//! - [`SchemaRegistry`]: the Field Metadata Registry, built at bootstrap
//! - [`IndexScope`]: the Index Scope Resolver, merging field metadata across
//!   the indexes of one query
//! - [`AnalysisRegistry`]: named analyzers and normalizers
//! - [`QueryConfig`]: query defaults loaded from TOML
//! - [`Error`]: the error taxonomy shared by every Fathom crate
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      fathom-core                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SchemaRegistry (FieldMetadataProvider)                     │
//! │  ├── IndexSchema → FieldDescriptor (codec, flags, analysis) │
//! │  └── AnalysisRegistry (analyzers, normalizers)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexScope                                                 │
//! │  └── FieldContext (per-path merge, lazy conflict checks)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FieldValue / GeoPoint, QueryConfig, Error                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod schema;
pub mod scope;
pub mod types;
pub mod value;

// Re-exports
pub use analysis::{
    AnalysisRegistry, AnalyzerDefinition, DEFAULT_ANALYZER, KEYWORD_ANALYZER, NormalizerDefinition,
    StopWordLanguage, TokenizerKind,
};
pub use config::QueryConfig;
pub use error::{Error, Result};
pub use schema::{
    FieldCodec, FieldDescriptor, FieldMetadataProvider, IndexSchema, ObjectStructure,
    SchemaRegistry, ValueType,
};
pub use scope::{FieldContext, FieldMember, IndexScope};
pub use types::{BooleanOperator, DistanceUnit, FailedLoadPolicy, SortOrder};
pub use value::{FieldValue, GeoPoint};
