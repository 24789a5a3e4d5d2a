//! Failures of the blocking search task.

use std::sync::Arc;

use async_trait::async_trait;
use fathom_core::{Error, IndexScope, QueryConfig, Result};
use fathom_query::predicate::{
    BoolPredicate, MatchAllPredicate, MatchPredicate, NestedPredicate, PhrasePredicate,
    RangePredicate, SimpleQueryStringPredicate,
};
use fathom_query::{
    BackendAdapter, BoolClauses, NativeSearchRequest, RawSearchResult, SearchScope, SortNode,
};
use fathom_tantivy::{TantivyBackend, TantivyQuery, TantivySort};
use tantivy::query::{EnableScoring, Query, Weight};

use crate::common::{Harness, loader};

/// A query that brings down the search task when Tantivy builds its weight.
#[derive(Debug, Clone)]
struct ExplodingQuery;

impl Query for ExplodingQuery {
    #[allow(clippy::panic)]
    fn weight(&self, _enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        panic!("weight construction failed");
    }
}

/// The Tantivy backend, with match-all compiled to [`ExplodingQuery`].
struct ExplodingBackend(TantivyBackend);

#[async_trait]
impl BackendAdapter for ExplodingBackend {
    type Predicate = TantivyQuery;
    type Sort = TantivySort;

    fn name(&self) -> &str {
        self.0.name()
    }

    fn match_all(&self, _scope: &IndexScope, _predicate: &MatchAllPredicate) -> Result<TantivyQuery> {
        Ok(TantivyQuery::new(Box::new(ExplodingQuery)))
    }

    fn match_field(&self, scope: &IndexScope, predicate: &MatchPredicate) -> Result<TantivyQuery> {
        self.0.match_field(scope, predicate)
    }

    fn range(&self, scope: &IndexScope, predicate: &RangePredicate) -> Result<TantivyQuery> {
        self.0.range(scope, predicate)
    }

    fn phrase(&self, scope: &IndexScope, predicate: &PhrasePredicate) -> Result<TantivyQuery> {
        self.0.phrase(scope, predicate)
    }

    fn simple_query_string(
        &self,
        scope: &IndexScope,
        predicate: &SimpleQueryStringPredicate,
    ) -> Result<TantivyQuery> {
        self.0.simple_query_string(scope, predicate)
    }

    fn bool(
        &self,
        scope: &IndexScope,
        predicate: &BoolPredicate,
        clauses: BoolClauses<TantivyQuery>,
    ) -> Result<TantivyQuery> {
        self.0.bool(scope, predicate, clauses)
    }

    fn nested(
        &self,
        scope: &IndexScope,
        predicate: &NestedPredicate,
        inner: TantivyQuery,
    ) -> Result<TantivyQuery> {
        self.0.nested(scope, predicate, inner)
    }

    fn sort(&self, scope: &IndexScope, sort: &SortNode) -> Result<TantivySort> {
        self.0.sort(scope, sort)
    }

    async fn execute(
        &self,
        request: NativeSearchRequest<TantivyQuery, TantivySort>,
    ) -> Result<RawSearchResult> {
        self.0.execute(request).await
    }
}

#[tokio::test]
async fn test_failed_search_task_is_aborted() {
    let harness = Harness::new();
    let backend = Arc::new(ExplodingBackend(harness.backend.as_ref().clone()));
    let scope = SearchScope::new(
        backend,
        &harness.registry,
        &["books"],
        Arc::new(QueryConfig::default()),
    )
    .unwrap();

    let err = scope
        .query::<String>(loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap_err();
    assert!(!err.is_query_error());
    let Error::Aborted { message } = err else {
        unreachable!("Expected Aborted error variant");
    };
    assert!(message.contains("search task failed"));

    // The backend is still usable afterwards.
    let result = harness
        .scope(&["books"])
        .query::<String>(loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 4);
}
