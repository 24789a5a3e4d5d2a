//! Query Orchestrator.
//!
//! ```text
//! SearchScope ──query()──► SearchQuerySelectStep ──select_*()──► SearchQueryBuilder
//!                                                                      │ build()
//!                                                                      ▼
//!                                         SearchResult ◄──fetch()── SearchQuery
//! ```
//!
//! A [`SearchQueryBuilder`] only accumulates. `build()` consumes it, checks
//! that every element accepts the scope, and compiles it; the resulting
//! [`SearchQuery`] is immutable. Each fetch dispatches the compiled request
//! and runs the projection pipeline with a fresh loading context, so nothing
//! loaded by one execution leaks into the next.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fathom_core::{
    FailedLoadPolicy, FieldMetadataProvider, IndexScope, QueryConfig, Result,
};

use crate::backend::{BackendAdapter, NativeSearchRequest};
use crate::loading::{EntityLoader, LoadingContext};
use crate::predicate::{PredicateFactory, PredicateFinalStep, SearchPredicate};
use crate::projection::{ProjectionFactory, ProjectionPlan, ProjectionValue, SearchProjection};
use crate::session::SessionContext;
use crate::sort::{SearchSort, SortFactory};

/// The entry point for querying a set of indexes through one backend.
///
/// Cheap to clone; build one per request, or share one across requests
/// targeting the same indexes.
pub struct SearchScope<B> {
    backend: Arc<B>,
    scope: Arc<IndexScope>,
    config: Arc<QueryConfig>,
}

impl<B> Clone for SearchScope<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            scope: Arc::clone(&self.scope),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: BackendAdapter> SearchScope<B> {
    /// Resolves `index_names` against `provider`.
    pub fn new<P, S>(
        backend: Arc<B>,
        provider: &P,
        index_names: &[S],
        config: Arc<QueryConfig>,
    ) -> Result<Self>
    where
        P: FieldMetadataProvider + ?Sized,
        S: AsRef<str>,
    {
        let scope = IndexScope::resolve(provider, index_names)?;
        Ok(Self {
            backend,
            scope: Arc::new(scope),
            config,
        })
    }

    /// The resolved index scope.
    pub fn index_scope(&self) -> &IndexScope {
        &self.scope
    }

    /// The backend queries are dispatched to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Query configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Predicate DSL for this scope.
    pub fn predicate(&self) -> PredicateFactory<'_> {
        PredicateFactory::new(&self.scope, &self.config)
    }

    /// Sort DSL for this scope.
    pub fn sort(&self) -> SortFactory<'_> {
        SortFactory::new(&self.scope)
    }

    /// Projection DSL for this scope.
    pub fn projection<E>(&self) -> ProjectionFactory<'_, E> {
        ProjectionFactory::new(&self.scope)
    }

    /// Starts a query loading entities with `loader`.
    pub fn query<E>(&self, loader: Arc<dyn EntityLoader<E>>) -> SearchQuerySelectStep<'_, B, E> {
        self.query_with(SessionContext::default(), loader)
    }

    /// Starts a query in a given session.
    pub fn query_with<E>(
        &self,
        session: SessionContext,
        loader: Arc<dyn EntityLoader<E>>,
    ) -> SearchQuerySelectStep<'_, B, E> {
        SearchQuerySelectStep {
            search_scope: self,
            session,
            loader,
        }
    }
}

/// Chooses what a query returns.
pub struct SearchQuerySelectStep<'q, B, E> {
    search_scope: &'q SearchScope<B>,
    session: SessionContext,
    loader: Arc<dyn EntityLoader<E>>,
}

impl<'q, B: BackendAdapter, E: Clone> SearchQuerySelectStep<'q, B, E> {
    /// Returns loaded entities.
    pub fn select_entity(self) -> SearchQueryBuilder<'q, B, E> {
        let projection = self.search_scope.projection().entity();
        self.select(projection)
    }

    /// Returns entity references, without loading.
    pub fn select_entity_reference(self) -> SearchQueryBuilder<'q, B, E> {
        let projection = self.search_scope.projection().entity_reference();
        self.select(projection)
    }

    /// Returns the values of `projection`.
    pub fn select(self, projection: SearchProjection<E>) -> SearchQueryBuilder<'q, B, E> {
        SearchQueryBuilder {
            search_scope: self.search_scope,
            session: self.session,
            loader: self.loader,
            projection,
            predicate: None,
            sort: None,
            offset: 0,
            limit: None,
        }
    }

    /// Returns a list with the values of `projections`, in order.
    pub fn select_list(
        self,
        projections: Vec<SearchProjection<E>>,
    ) -> Result<SearchQueryBuilder<'q, B, E>> {
        let projection = self.search_scope.projection().composite(projections)?;
        Ok(self.select(projection))
    }
}

/// Accumulates the predicate, sort and pagination of a query.
pub struct SearchQueryBuilder<'q, B, E> {
    search_scope: &'q SearchScope<B>,
    session: SessionContext,
    loader: Arc<dyn EntityLoader<E>>,
    projection: SearchProjection<E>,
    predicate: Option<SearchPredicate>,
    sort: Option<SearchSort>,
    offset: usize,
    limit: Option<usize>,
}

impl<'q, B: BackendAdapter, E: Clone> SearchQueryBuilder<'q, B, E> {
    /// Sets the predicate; without one, every document matches.
    pub fn predicate(mut self, predicate: SearchPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Builds the predicate in place.
    pub fn predicate_with<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(PredicateFactory<'q>) -> Result<SearchPredicate>,
    {
        let predicate = build(self.search_scope.predicate())?;
        Ok(self.predicate(predicate))
    }

    /// Adds a sort; later sorts break ties of earlier ones.
    pub fn sort(mut self, sort: SearchSort) -> Result<Self> {
        self.sort = Some(match self.sort.take() {
            Some(previous) => previous.then(sort)?,
            None => sort,
        });
        Ok(self)
    }

    /// Builds a sort in place.
    pub fn sort_with<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(SortFactory<'q>) -> Result<SearchSort>,
    {
        let sort = build(self.search_scope.sort())?;
        self.sort(sort)
    }

    /// Number of hits to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Maximum number of hits returned by `fetch()`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates and compiles the query.
    pub fn build(self) -> Result<SearchQuery<B, E>> {
        let search_scope = self.search_scope;
        let scope = search_scope.index_scope();
        let backend = search_scope.backend();

        let predicate = match self.predicate {
            Some(p) => p,
            None => search_scope.predicate().match_all().to_predicate()?,
        };
        scope.check_covered_by("Predicate", predicate.index_names())?;
        if let Some(sort) = &self.sort {
            scope.check_covered_by("Sort", sort.index_names())?;
        }
        scope.check_covered_by("Projection", self.projection.index_names())?;

        let native_predicate = predicate.compile(scope, backend)?;
        let native_sorts = match &self.sort {
            Some(sort) => sort.compile(scope, backend)?,
            None => Vec::new(),
        };
        let plan = ProjectionPlan::new(&self.projection);

        log::debug!(
            "Compiled query on {:?} for backend '{}': {} sort elements, {} hit requirements",
            scope.index_names(),
            backend.name(),
            native_sorts.len(),
            plan.requirements().len()
        );
        if search_scope.config().log_native_queries {
            log::trace!("Native predicate: {native_predicate:?}");
            log::trace!("Native sorts: {native_sorts:?}");
        }

        Ok(SearchQuery {
            backend: Arc::clone(&search_scope.backend),
            index_names: scope.index_names().to_vec(),
            config: Arc::clone(&search_scope.config),
            session: self.session,
            loader: self.loader,
            predicate: native_predicate,
            sorts: native_sorts,
            plan,
            offset: self.offset,
            limit: self.limit,
        })
    }

    /// Builds the query and fetches one page.
    pub async fn fetch(self) -> Result<SearchResult<E>> {
        self.build()?.fetch().await
    }
}

/// The result of one query execution.
#[derive(Debug, Clone)]
pub struct SearchResult<E> {
    /// Number of matching documents, regardless of pagination.
    pub total_hit_count: u64,
    /// Projected hits, in rank order.
    pub hits: Vec<ProjectionValue<E>>,
    /// Number of hits whose entity failed to load.
    pub failed_loads: usize,
    /// Time spent in the backend and the pipeline.
    pub took: Duration,
}

impl<E> SearchResult<E> {
    /// The loaded entities of an entity query, skipping anything else.
    pub fn entities(self) -> Vec<E> {
        self.hits
            .into_iter()
            .filter_map(ProjectionValue::into_entity)
            .collect()
    }

    /// Whether some entity failed to load.
    pub fn has_failed_loads(&self) -> bool {
        self.failed_loads > 0
    }
}

/// A compiled query.
pub struct SearchQuery<B: BackendAdapter, E> {
    backend: Arc<B>,
    index_names: Vec<String>,
    config: Arc<QueryConfig>,
    session: SessionContext,
    loader: Arc<dyn EntityLoader<E>>,
    predicate: B::Predicate,
    sorts: Vec<B::Sort>,
    plan: ProjectionPlan<E>,
    offset: usize,
    limit: Option<usize>,
}

impl<B: BackendAdapter, E: Clone> SearchQuery<B, E> {
    /// The compiled predicate.
    pub fn native_predicate(&self) -> &B::Predicate {
        &self.predicate
    }

    /// The compiled sort elements.
    pub fn native_sorts(&self) -> &[B::Sort] {
        &self.sorts
    }

    /// Fetches the configured page; without a limit, the configured default
    /// page size applies.
    pub async fn fetch(&self) -> Result<SearchResult<E>> {
        let limit = self.limit.unwrap_or(self.config.default_limit);
        self.execute(self.offset, Some(limit)).await
    }

    /// Fetches every hit from the offset on.
    pub async fn fetch_all(&self) -> Result<SearchResult<E>> {
        self.execute(self.offset, None).await
    }

    /// Counts matching documents without fetching hits.
    pub async fn fetch_total_hit_count(&self) -> Result<u64> {
        let request = self.request(0, Some(0), false);
        Ok(self.backend.execute(request).await?.total_hit_count)
    }

    fn request(
        &self,
        offset: usize,
        limit: Option<usize>,
        with_hits: bool,
    ) -> NativeSearchRequest<B::Predicate, B::Sort> {
        NativeSearchRequest {
            index_names: self.index_names.clone(),
            predicate: self.predicate.clone(),
            sorts: self.sorts.clone(),
            offset,
            limit,
            requirements: if with_hits {
                self.plan.requirements().to_vec()
            } else {
                Vec::new()
            },
            track_scores: with_hits && self.plan.track_scores(),
            session: self.session.clone(),
        }
    }

    async fn execute(&self, offset: usize, limit: Option<usize>) -> Result<SearchResult<E>> {
        let start = Instant::now();
        let raw = self
            .backend
            .execute(self.request(offset, limit, true))
            .await?;
        log::debug!(
            "Backend '{}' returned {} hits of {} in {:?}",
            self.backend.name(),
            raw.hits.len(),
            raw.total_hit_count,
            start.elapsed()
        );

        let mut loading = LoadingContext::new();
        let extracted: Vec<_> = raw
            .hits
            .into_iter()
            .map(|hit| self.plan.extract(hit, &mut loading))
            .collect();
        let loaded = loading.resolve(self.loader.as_ref()).await?;

        let mut hits = Vec::with_capacity(extracted.len());
        let mut failed_loads = 0;
        for hit in &extracted {
            let transformed = self.plan.transform(hit, self.loader.as_ref(), &loaded);
            if transformed.failed_load {
                failed_loads += 1;
                if self.config.failed_load_policy == FailedLoadPolicy::SkipHit {
                    continue;
                }
            }
            hits.push(transformed.value);
        }
        if failed_loads > 0 {
            log::warn!(
                "{failed_loads} hits referenced entities that could not be loaded (policy: {:?})",
                self.config.failed_load_policy
            );
        }

        Ok(SearchResult {
            total_hit_count: raw.total_hit_count,
            hits,
            failed_loads,
            took: start.elapsed(),
        })
    }
}
