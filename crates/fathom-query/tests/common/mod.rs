//! Common test utilities for fathom-query integration tests.
//!
//! [`RecordingBackend`] compiles predicates and sorts into compact strings,
//! records every request it receives and answers from an in-memory list of
//! documents.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fathom_core::{
    AnalysisRegistry, FieldDescriptor, FieldValue, IndexSchema, IndexScope, ObjectStructure,
    QueryConfig, Result, SchemaRegistry,
};
use fathom_query::predicate::{
    BoolPredicate, MatchAllPredicate, MatchPredicate, NestedPredicate, PhrasePredicate,
    RangePredicate, SimpleQueryStringPredicate,
};
use fathom_query::{
    BackendAdapter, BoolClauses, DocumentReference, HitRequirement, MapEntityLoader,
    NativeSearchRequest, PredicateOptions, RangeBound, RawHit, RawSearchResult, RawValue,
    SearchScope, SortNode,
};

/// A stored document.
#[derive(Debug, Clone)]
pub struct TestDoc {
    pub index: String,
    pub id: String,
    pub score: f32,
    pub fields: BTreeMap<String, Vec<FieldValue>>,
}

impl TestDoc {
    pub fn new(index: &str, id: &str, score: f32) -> Self {
        Self {
            index: index.to_string(),
            id: id.to_string(),
            score,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, path: &str, value: impl Into<FieldValue>) -> Self {
        self.fields
            .entry(path.to_string())
            .or_default()
            .push(value.into());
        self
    }
}

/// What the backend saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub index_names: Vec<String>,
    pub predicate: String,
    pub sorts: Vec<String>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub requirements: Vec<HitRequirement>,
    pub track_scores: bool,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    docs: Vec<TestDoc>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RecordingBackend {
    pub fn new(docs: Vec<TestDoc>) -> Self {
        Self {
            docs,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().unwrap()
    }
}

fn with_options(body: String, options: &PredicateOptions) -> String {
    match (options.constant_score, options.boost) {
        (true, _) => format!("const({body})^{}", options.constant_score_value()),
        (false, Some(boost)) => format!("{body}^{boost}"),
        (false, None) => body,
    }
}

fn field_with_boost(path: &str, boost: Option<f32>) -> String {
    match boost {
        Some(b) => format!("{path}^{b}"),
        None => path.to_string(),
    }
}

fn bound(b: &Option<RangeBound>, lower: bool) -> String {
    match (b, lower) {
        (None, _) => "*".to_string(),
        (Some(b), true) => format!("{}{}", if b.inclusive { "[" } else { "(" }, b.value),
        (Some(b), false) => format!("{}{}", b.value, if b.inclusive { "]" } else { ")" }),
    }
}

fn clause_list(name: &str, clauses: &[String]) -> Option<String> {
    (!clauses.is_empty()).then(|| format!("{name}:[{}]", clauses.join(",")))
}

#[async_trait]
impl BackendAdapter for RecordingBackend {
    type Predicate = String;
    type Sort = String;

    fn name(&self) -> &str {
        "recording"
    }

    fn match_all(&self, _scope: &IndexScope, p: &MatchAllPredicate) -> Result<String> {
        Ok(with_options("match_all".to_string(), &p.options))
    }

    fn match_field(&self, _scope: &IndexScope, p: &MatchPredicate) -> Result<String> {
        let targets: Vec<String> = p
            .targets
            .iter()
            .map(|t| {
                format!(
                    "{}:{}",
                    field_with_boost(t.target.path(), t.target.boost),
                    t.value
                )
            })
            .collect();
        let mut body = format!("match({})", targets.join("|"));
        if let Some(f) = p.fuzziness {
            body.push_str(&format!("~{}/{}", f.max_edit_distance, f.exact_prefix_length));
        }
        if let Some(a) = &p.analysis {
            body.push_str(&format!("@{}", a.analyzer_name()));
        }
        Ok(with_options(body, &p.options))
    }

    fn range(&self, _scope: &IndexScope, p: &RangePredicate) -> Result<String> {
        let body = format!(
            "range({}:{},{})",
            p.field.path(),
            bound(&p.lower, true),
            bound(&p.upper, false)
        );
        Ok(with_options(body, &p.options))
    }

    fn phrase(&self, _scope: &IndexScope, p: &PhrasePredicate) -> Result<String> {
        let fields: Vec<String> = p
            .targets
            .iter()
            .map(|t| field_with_boost(t.path(), t.boost))
            .collect();
        let body = format!("phrase({}:\"{}\"~{})", fields.join(","), p.text, p.slop);
        Ok(with_options(body, &p.options))
    }

    fn simple_query_string(
        &self,
        _scope: &IndexScope,
        p: &SimpleQueryStringPredicate,
    ) -> Result<String> {
        let fields: Vec<String> = p
            .targets
            .iter()
            .map(|t| field_with_boost(t.path(), t.boost))
            .collect();
        let body = format!(
            "sqs({}:{}/{})",
            fields.join(","),
            p.effective_query(),
            p.default_operator
        );
        Ok(with_options(body, &p.options))
    }

    fn bool(
        &self,
        _scope: &IndexScope,
        p: &BoolPredicate,
        clauses: BoolClauses<String>,
    ) -> Result<String> {
        let parts: Vec<String> = [
            clause_list("must", &clauses.must),
            clause_list("should", &clauses.should),
            clause_list("must_not", &clauses.must_not),
            clause_list("filter", &clauses.filter),
        ]
        .into_iter()
        .flatten()
        .collect();
        Ok(with_options(format!("bool({})", parts.join(",")), &p.options))
    }

    fn nested(&self, _scope: &IndexScope, p: &NestedPredicate, inner: String) -> Result<String> {
        Ok(format!("nested({}:{inner})", p.object_path))
    }

    fn sort(&self, _scope: &IndexScope, sort: &SortNode) -> Result<String> {
        Ok(match sort {
            SortNode::Score { order } => format!("score {order:?}"),
            SortNode::Field {
                field,
                order,
                missing,
            } => format!("{} {order:?} {missing:?}", field.path()),
            SortNode::Distance { field, order, .. } => {
                format!("distance({}) {order:?}", field.path())
            }
        })
    }

    async fn execute(&self, request: NativeSearchRequest<String, String>) -> Result<RawSearchResult> {
        self.requests.lock().unwrap().push(RecordedRequest {
            index_names: request.index_names.clone(),
            predicate: request.predicate.clone(),
            sorts: request.sorts.clone(),
            offset: request.offset,
            limit: request.limit,
            requirements: request.requirements.clone(),
            track_scores: request.track_scores,
            tenant_id: request.session.tenant_id().map(str::to_string),
        });

        let matching: Vec<&TestDoc> = self
            .docs
            .iter()
            .filter(|d| request.index_names.contains(&d.index))
            .collect();
        let end = request
            .limit
            .map_or(matching.len(), |l| (request.offset + l).min(matching.len()));
        let page = matching.get(request.offset.min(end)..end).unwrap_or_default();

        let hits = page
            .iter()
            .map(|doc| RawHit {
                reference: DocumentReference::new(&doc.index, &doc.id),
                score: request.track_scores.then_some(doc.score),
                values: request
                    .requirements
                    .iter()
                    .map(|r| raw_value(doc, r))
                    .collect(),
            })
            .collect();
        Ok(RawSearchResult {
            total_hit_count: matching.len() as u64,
            hits,
        })
    }
}

fn raw_value(doc: &TestDoc, requirement: &HitRequirement) -> RawValue {
    match requirement {
        HitRequirement::FieldValues { path } => match doc.fields.get(path) {
            Some(values) => RawValue::Values(values.clone()),
            None => RawValue::Missing,
        },
        HitRequirement::Distance { path, center } => {
            match doc
                .fields
                .get(path)
                .and_then(|v| v.first())
                .and_then(FieldValue::as_geo_point)
            {
                Some(point) => RawValue::Distance(point.distance_to(center)),
                None => RawValue::Missing,
            }
        }
    }
}

/// Schemas: `books` and `films` are compatible; `magazines` analyzes `title`
/// differently and stores `year` as a double.
pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new(AnalysisRegistry::default())
        .with_index(
            IndexSchema::new("books")
                .with_field("title", FieldDescriptor::text("standard_english"))
                .with_field("summary", FieldDescriptor::text("standard_english"))
                .with_field("genre", FieldDescriptor::keyword().with_normalizer("lowercase"))
                .with_field("year", FieldDescriptor::long())
                .with_field("location", FieldDescriptor::geo_point())
                .with_field("authors.name", FieldDescriptor::keyword())
                .with_object("authors", ObjectStructure::Nested),
        )
        .unwrap()
        .with_index(
            IndexSchema::new("films")
                .with_field("title", FieldDescriptor::text("standard_english"))
                .with_field("genre", FieldDescriptor::keyword().with_normalizer("lowercase"))
                .with_field("year", FieldDescriptor::long()),
        )
        .unwrap()
        .with_index(
            IndexSchema::new("magazines")
                .with_field("title", FieldDescriptor::text("whitespace_lowercase"))
                .with_field("year", FieldDescriptor::double()),
        )
        .unwrap()
}

pub fn docs() -> Vec<TestDoc> {
    vec![
        TestDoc::new("books", "1", 3.0)
            .with("title", "Panda breeding")
            .with("year", 2001i64)
            .with("genre", "science")
            .with("genre", "nature"),
        TestDoc::new("books", "2", 2.0)
            .with("title", "Bamboo forests")
            .with("year", 1999i64),
        TestDoc::new("books", "3", 1.0).with("title", "Mountain trails"),
        TestDoc::new("films", "1", 0.5)
            .with("title", "Kung fu panda")
            .with("year", 2008i64),
    ]
}

pub fn loader() -> Arc<MapEntityLoader<String>> {
    Arc::new(
        MapEntityLoader::new()
            .with_entity("books", "1", "Panda breeding".to_string())
            .with_entity("books", "2", "Bamboo forests".to_string())
            .with_entity("films", "1", "Kung fu panda".to_string()),
    )
}

pub struct Harness {
    pub backend: Arc<RecordingBackend>,
    pub registry: SchemaRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(RecordingBackend::new(docs())),
            registry: registry(),
        }
    }

    pub fn scope(&self, indexes: &[&str]) -> SearchScope<RecordingBackend> {
        self.scope_with(indexes, QueryConfig::default())
    }

    pub fn scope_with(&self, indexes: &[&str], config: QueryConfig) -> SearchScope<RecordingBackend> {
        SearchScope::new(
            Arc::clone(&self.backend),
            &self.registry,
            indexes,
            Arc::new(config),
        )
        .unwrap()
    }
}
