//! Embedded Tantivy backend.
//!
//! All registered indexes live in one in-memory Tantivy index. Queries are
//! restricted to their target indexes by a non-scoring filter on the hidden
//! `_index` field, and to the session tenant, if any, on `_tenant`.

use std::sync::Arc;

use async_trait::async_trait;
use fathom_core::{Error, FieldMetadataProvider, IndexScope, Result, SchemaRegistry};
use fathom_query::predicate::{
    BoolPredicate, MatchAllPredicate, MatchPredicate, NestedPredicate, PhrasePredicate,
    RangePredicate, SimpleQueryStringPredicate,
};
use fathom_query::{BackendAdapter, BoolClauses, NativeSearchRequest, RawSearchResult, SortNode};
use tantivy::{Index, IndexReader, ReloadPolicy};

use crate::analysis::Analyzers;
use crate::collect::SearchPlan;
use crate::compile::{Compiler, TantivyQuery};
use crate::indexer::{Indexer, WRITER_BUFFER_SIZE};
use crate::schema::PhysicalSchema;
use crate::sort::TantivySort;

/// Backend name used in errors and logs.
pub const BACKEND_NAME: &str = "tantivy";

/// Maps a Tantivy failure to a backend error.
pub(crate) fn tantivy_error<E>(message: &str, source: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::backend_with_source(BACKEND_NAME, message, source)
}

/// Search backend over an embedded, in-memory Tantivy index.
///
/// Cloning is cheap and clones share the same index.
#[derive(Clone)]
pub struct TantivyBackend {
    index: Index,
    reader: IndexReader,
    schema: Arc<PhysicalSchema>,
    analyzers: Arc<Analyzers>,
}

impl TantivyBackend {
    /// Creates an empty index hosting every index of `registry`.
    pub fn new(registry: &SchemaRegistry) -> Result<Self> {
        let schema = PhysicalSchema::build(registry);
        let index = Index::create_in_ram(schema.schema().clone());

        let analyzers = Analyzers::from_registry(registry.analysis())?;
        analyzers.register(index.tokenizers());

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| tantivy_error("failed to create index reader", e))?;

        log::info!(
            "Created Tantivy backend for indexes [{}]",
            registry.index_names().join(", ")
        );
        Ok(Self {
            index,
            reader,
            schema: Arc::new(schema),
            analyzers: Arc::new(analyzers),
        })
    }

    /// Opens a writer on the index.
    ///
    /// Tantivy allows one writer at a time; drop the previous indexer first.
    pub fn indexer(&self) -> Result<Indexer> {
        let writer = self
            .index
            .writer_with_num_threads(1, WRITER_BUFFER_SIZE)
            .map_err(|e| tantivy_error("failed to create index writer", e))?;
        Ok(Indexer::new(
            writer,
            self.reader.clone(),
            Arc::clone(&self.schema),
        ))
    }

    /// Number of committed Tantivy documents across all indexes, counting
    /// one hidden document per nested object.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// The physical schema.
    pub fn schema(&self) -> &PhysicalSchema {
        &self.schema
    }

    fn compiler(&self) -> Compiler<'_> {
        Compiler {
            schema: &self.schema,
            analyzers: &self.analyzers,
        }
    }
}

impl std::fmt::Debug for TantivyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyBackend")
            .field("schema", &self.schema)
            .field("analyzers", &self.analyzers)
            .finish()
    }
}

#[async_trait]
impl BackendAdapter for TantivyBackend {
    type Predicate = TantivyQuery;
    type Sort = TantivySort;

    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn match_all(&self, _scope: &IndexScope, predicate: &MatchAllPredicate) -> Result<TantivyQuery> {
        Ok(TantivyQuery::new(self.compiler().match_all(&predicate.options)))
    }

    fn match_field(&self, _scope: &IndexScope, predicate: &MatchPredicate) -> Result<TantivyQuery> {
        self.compiler().match_field(predicate).map(TantivyQuery::new)
    }

    fn range(&self, _scope: &IndexScope, predicate: &RangePredicate) -> Result<TantivyQuery> {
        self.compiler().range(predicate).map(TantivyQuery::new)
    }

    fn phrase(&self, _scope: &IndexScope, predicate: &PhrasePredicate) -> Result<TantivyQuery> {
        self.compiler().phrase(predicate).map(TantivyQuery::new)
    }

    fn simple_query_string(
        &self,
        _scope: &IndexScope,
        predicate: &SimpleQueryStringPredicate,
    ) -> Result<TantivyQuery> {
        self.compiler()
            .simple_query_string(predicate)
            .map(TantivyQuery::new)
    }

    fn bool(
        &self,
        _scope: &IndexScope,
        predicate: &BoolPredicate,
        clauses: BoolClauses<TantivyQuery>,
    ) -> Result<TantivyQuery> {
        Ok(TantivyQuery::new(self.compiler().bool(predicate, clauses)))
    }

    fn nested(
        &self,
        _scope: &IndexScope,
        predicate: &NestedPredicate,
        inner: TantivyQuery,
    ) -> Result<TantivyQuery> {
        Ok(TantivyQuery::new(
            self.compiler()
                .nested(&predicate.object_path, inner.into_inner()),
        ))
    }

    fn sort(&self, _scope: &IndexScope, sort: &SortNode) -> Result<TantivySort> {
        TantivySort::compile(&self.schema, sort)
    }

    async fn execute(
        &self,
        request: NativeSearchRequest<TantivyQuery, TantivySort>,
    ) -> Result<RawSearchResult> {
        let query = self.compiler().scoped(
            request.predicate.into_inner(),
            &request.index_names,
            request.session.tenant_id(),
        );
        log::debug!(
            "Executing search on [{}] (offset {}, limit {:?}, {} sorts)",
            request.index_names.join(", "),
            request.offset,
            request.limit,
            request.sorts.len()
        );

        let plan = SearchPlan {
            query,
            sorts: request.sorts,
            offset: request.offset,
            limit: request.limit,
            requirements: request.requirements,
            track_scores: request.track_scores,
        };
        let searcher = self.reader.searcher();
        let schema = Arc::clone(&self.schema);
        tokio::task::spawn_blocking(move || plan.run(&searcher, &schema))
            .await
            .map_err(|e| Error::aborted(format!("search task failed: {e}")))?
    }
}
