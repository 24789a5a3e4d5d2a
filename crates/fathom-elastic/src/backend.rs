//! Elasticsearch-style JSON backend.

use std::sync::Arc;

use async_trait::async_trait;
use fathom_core::{Error, IndexScope, Result, SchemaRegistry};
use fathom_query::predicate::{
    BoolPredicate, MatchAllPredicate, MatchPredicate, NestedPredicate, PhrasePredicate,
    RangePredicate, SimpleQueryStringPredicate,
};
use fathom_query::{
    BackendAdapter, BoolClauses, Capability, NativeSearchRequest, RawSearchResult, SortNode,
};

use crate::compile::{self, ElasticQuery};
use crate::request::{self, MAX_RESULT_WINDOW, SearchRequest};
use crate::response::{self, CodecTable};
use crate::sort::ElasticSort;
use crate::transport::Transport;

/// Backend name used in errors and logs.
pub const BACKEND_NAME: &str = "elasticsearch";

/// Maps a dispatch or parsing failure to a backend error.
pub(crate) fn elastic_error<E>(message: &str, source: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::backend_with_source(BACKEND_NAME, message, source)
}

/// Session capability routing searches to the shards of a key.
pub struct Routing;

impl Capability for Routing {
    type Handle = String;
}

/// Search backend producing Elasticsearch query DSL, sent through a
/// [`Transport`].
pub struct ElasticBackend<T> {
    transport: Arc<T>,
    codecs: Arc<CodecTable>,
}

impl<T: Transport> ElasticBackend<T> {
    /// Creates a backend for the indexes of `registry`.
    pub fn new(registry: &SchemaRegistry, transport: T) -> Self {
        log::info!(
            "Created Elasticsearch backend for indexes [{}]",
            registry.index_names().join(", ")
        );
        Self {
            transport: Arc::new(transport),
            codecs: Arc::new(CodecTable::build(registry)),
        }
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds the request a native search request is sent as.
    pub fn search_request(
        &self,
        request: &NativeSearchRequest<ElasticQuery, ElasticSort>,
    ) -> SearchRequest {
        SearchRequest {
            indexes: request.index_names.clone(),
            routing: request.session.capability::<Routing>().cloned(),
            body: request::body(request),
        }
    }
}

impl<T> Clone for ElasticBackend<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            codecs: Arc::clone(&self.codecs),
        }
    }
}

impl<T> std::fmt::Debug for ElasticBackend<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticBackend")
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Transport + 'static> BackendAdapter for ElasticBackend<T> {
    type Predicate = ElasticQuery;
    type Sort = ElasticSort;

    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn match_all(&self, _scope: &IndexScope, predicate: &MatchAllPredicate) -> Result<ElasticQuery> {
        Ok(ElasticQuery::new(compile::match_all(&predicate.options)))
    }

    fn match_field(&self, _scope: &IndexScope, predicate: &MatchPredicate) -> Result<ElasticQuery> {
        compile::match_field(predicate).map(ElasticQuery::new)
    }

    fn range(&self, _scope: &IndexScope, predicate: &RangePredicate) -> Result<ElasticQuery> {
        compile::range(predicate).map(ElasticQuery::new)
    }

    fn phrase(&self, _scope: &IndexScope, predicate: &PhrasePredicate) -> Result<ElasticQuery> {
        Ok(ElasticQuery::new(compile::phrase(predicate)))
    }

    fn simple_query_string(
        &self,
        _scope: &IndexScope,
        predicate: &SimpleQueryStringPredicate,
    ) -> Result<ElasticQuery> {
        Ok(ElasticQuery::new(compile::simple_query_string(predicate)))
    }

    fn bool(
        &self,
        _scope: &IndexScope,
        predicate: &BoolPredicate,
        clauses: BoolClauses<ElasticQuery>,
    ) -> Result<ElasticQuery> {
        Ok(ElasticQuery::new(compile::bool(predicate, clauses)))
    }

    fn nested(
        &self,
        _scope: &IndexScope,
        predicate: &NestedPredicate,
        inner: ElasticQuery,
    ) -> Result<ElasticQuery> {
        Ok(ElasticQuery::new(compile::nested(predicate, inner)))
    }

    fn sort(&self, _scope: &IndexScope, sort: &SortNode) -> Result<ElasticSort> {
        ElasticSort::compile(sort)
    }

    async fn execute(
        &self,
        request: NativeSearchRequest<ElasticQuery, ElasticSort>,
    ) -> Result<RawSearchResult> {
        let search = self.search_request(&request);
        log::debug!(
            "Executing search on {} (routing {:?})",
            search.path(),
            search.routing
        );
        let response = self.transport.search(search).await?;
        let result = response::parse(
            response,
            &request.requirements,
            request.track_scores,
            &request.index_names,
            &self.codecs,
        )?;
        // Hits past the result window are out of reach of a single request.
        if request.limit.is_none() && result.total_hit_count > MAX_RESULT_WINDOW as u64 {
            return Err(Error::backend(
                BACKEND_NAME,
                format!(
                    "{} hits match but at most {MAX_RESULT_WINDOW} can be fetched at once; \
                     fetch pages with an offset and a limit",
                    result.total_hit_count
                ),
            ));
        }
        Ok(result)
    }
}
