//! Elasticsearch-style JSON backend for Fathom.
//!
//! Predicates compile to query DSL objects and sorts to `sort` entries; a
//! search is sent as one `_search` request through a pluggable
//! [`Transport`]. Analysis, scoring and distance computations run on the
//! engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     fathom-elastic                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ElasticBackend (BackendAdapter)                            │
//! │  ├── compile: PredicateNode → ElasticQuery (query DSL)      │
//! │  ├── sort: SortNode → ElasticSort                           │
//! │  ├── request: from/size/sort/_source/script_fields          │
//! │  └── response: hits → RawSearchResult                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transport                                                  │
//! │  └── HttpTransport (reqwest, `http` feature)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use fathom_elastic::{ElasticBackend, HttpTransport, Routing};
//! use fathom_query::{SearchScope, SessionContext};
//!
//! let transport = HttpTransport::new("http://localhost:9200")?;
//! let backend = Arc::new(ElasticBackend::new(&registry, transport));
//! let scope = SearchScope::new(backend, &registry, &["books"], config)?;
//! let session = SessionContext::new().with_capability::<Routing>("user-42".to_string());
//! let result = scope
//!     .query_with(session, loader)
//!     .select_entity_reference()
//!     .fetch()
//!     .await?;
//! ```
//!
//! # Mapping
//!
//! Documents are expected in indexes named after the logical indexes, with
//! the tenant, if any, in a `_tenant_id` keyword field.

pub mod backend;
pub mod compile;
pub mod request;
pub mod sort;
pub mod transport;

mod response;

// Re-exports
pub use backend::{BACKEND_NAME, ElasticBackend, Routing};
pub use compile::{ElasticQuery, TENANT_FIELD};
pub use request::{MAX_RESULT_WINDOW, SearchRequest};
pub use sort::ElasticSort;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::Transport;
