//! Backend adapter contract.
//!
//! A backend compiles each predicate kind and sort element into its native
//! representation and executes the assembled request. The set of kinds is
//! closed: adding a kind means adding a method here, which every backend must
//! then implement.

use std::fmt;

use async_trait::async_trait;
use fathom_core::{FieldValue, GeoPoint, IndexScope, Result};

use crate::loading::DocumentReference;
use crate::predicate::{
    BoolClauses, BoolPredicate, MatchAllPredicate, MatchPredicate, NestedPredicate,
    PhrasePredicate, RangePredicate, SimpleQueryStringPredicate,
};
use crate::session::SessionContext;
use crate::sort::SortNode;

/// Per-hit data a projection needs from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum HitRequirement {
    /// Stored values of a field.
    FieldValues {
        /// Field path.
        path: String,
    },
    /// Distance in meters between a geo-point field and a center.
    Distance {
        /// Geo-point field path.
        path: String,
        /// Reference point.
        center: GeoPoint,
    },
}

/// Raw data extracted for one requirement of one hit.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The document holds no value.
    Missing,
    /// Stored values, in document order.
    Values(Vec<FieldValue>),
    /// Distance in meters.
    Distance(f64),
}

static MISSING: RawValue = RawValue::Missing;

/// One hit as returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    /// The matched document.
    pub reference: DocumentReference,
    /// Relevance score, when computed.
    pub score: Option<f32>,
    /// One value per requirement of the request, in the same order.
    pub values: Vec<RawValue>,
}

impl RawHit {
    /// The value extracted for requirement `slot`.
    pub fn value(&self, slot: usize) -> &RawValue {
        self.values.get(slot).unwrap_or(&MISSING)
    }
}

/// A page of hits as returned by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResult {
    /// Number of matching documents, regardless of pagination.
    pub total_hit_count: u64,
    /// Hits of the requested page, in rank order.
    pub hits: Vec<RawHit>,
}

/// A compiled request, ready for dispatch.
#[derive(Debug, Clone)]
pub struct NativeSearchRequest<P, S> {
    /// Targeted indexes.
    pub index_names: Vec<String>,
    /// Compiled predicate.
    pub predicate: P,
    /// Compiled sort elements; empty means by score.
    pub sorts: Vec<S>,
    /// Number of hits to skip.
    pub offset: usize,
    /// Maximum number of hits; `None` means all.
    pub limit: Option<usize>,
    /// Data to extract for each hit.
    pub requirements: Vec<HitRequirement>,
    /// Whether hits need a score.
    pub track_scores: bool,
    /// Session of the request.
    pub session: SessionContext,
}

/// A search engine adapter.
///
/// Compilation methods are pure: the same node over the same scope must
/// always produce the same native value.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Native predicate representation.
    type Predicate: Clone + fmt::Debug + Send + Sync + 'static;
    /// Native sort representation.
    type Sort: Clone + fmt::Debug + Send + Sync + 'static;

    /// Backend name used in errors and logs.
    fn name(&self) -> &str;

    /// Compiles a match-all predicate.
    fn match_all(&self, scope: &IndexScope, predicate: &MatchAllPredicate)
    -> Result<Self::Predicate>;

    /// Compiles a match predicate.
    fn match_field(&self, scope: &IndexScope, predicate: &MatchPredicate)
    -> Result<Self::Predicate>;

    /// Compiles a range predicate.
    fn range(&self, scope: &IndexScope, predicate: &RangePredicate) -> Result<Self::Predicate>;

    /// Compiles a phrase predicate.
    fn phrase(&self, scope: &IndexScope, predicate: &PhrasePredicate) -> Result<Self::Predicate>;

    /// Compiles a simple query string predicate.
    fn simple_query_string(
        &self,
        scope: &IndexScope,
        predicate: &SimpleQueryStringPredicate,
    ) -> Result<Self::Predicate>;

    /// Combines compiled clauses of a boolean predicate.
    fn bool(
        &self,
        scope: &IndexScope,
        predicate: &BoolPredicate,
        clauses: BoolClauses<Self::Predicate>,
    ) -> Result<Self::Predicate>;

    /// Wraps a compiled inner predicate into a nested predicate.
    fn nested(
        &self,
        scope: &IndexScope,
        predicate: &NestedPredicate,
        inner: Self::Predicate,
    ) -> Result<Self::Predicate>;

    /// Compiles one sort element.
    fn sort(&self, scope: &IndexScope, sort: &SortNode) -> Result<Self::Sort>;

    /// Executes a request.
    ///
    /// Dropping the returned future cancels the request.
    async fn execute(
        &self,
        request: NativeSearchRequest<Self::Predicate, Self::Sort>,
    ) -> Result<RawSearchResult>;
}
