//! Predicate compilation into Elasticsearch query DSL.
//!
//! Analysis happens on the server: query text is sent as supplied, with the
//! analyzer override, if any, named in the query. Keyword fields are
//! normalized by their mapping's normalizer.

use std::fmt;

use fathom_core::{Error, FieldCodec, FieldValue, Result};
use fathom_query::predicate::{
    BoolPredicate, MatchPredicate, NestedPredicate, PhrasePredicate, RangeBound, RangePredicate,
    SimpleQueryStringPredicate,
};
use fathom_query::{AnalysisOverride, BoolClauses, FieldTarget, PredicateOptions, SimpleQueryFlags};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Field holding the tenant of a document.
pub const TENANT_FIELD: &str = "_tenant_id";

/// A compiled query: one Elasticsearch query DSL object.
#[derive(Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ElasticQuery(Value);

impl ElasticQuery {
    /// Wraps a query DSL object.
    pub fn new(query: Value) -> Self {
        Self(query)
    }

    /// The query DSL object.
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Unwraps the query DSL object.
    pub fn into_json(self) -> Value {
        self.0
    }
}

impl fmt::Debug for ElasticQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElasticQuery({})", self.0)
    }
}

pub(crate) fn match_all(options: &PredicateOptions) -> Value {
    let mut body = Map::new();
    insert_boost(&mut body, scoring_boost(options));
    finish(json!({ "match_all": body }), options)
}

pub(crate) fn match_field(predicate: &MatchPredicate) -> Result<Value> {
    let single = predicate.targets.len() == 1;
    let mut clauses = Vec::with_capacity(predicate.targets.len());
    for target in &predicate.targets {
        let path = target.target.path();
        let codec = target.target.field.codec()?;
        if codec == FieldCodec::GeoPoint {
            return Err(Error::unsupported(path, "Match predicates", codec));
        }

        let mut body = Map::new();
        body.insert("query".into(), json_value(&target.value));
        if codec.is_text_like() {
            if let Some(fuzziness) = predicate.fuzziness {
                body.insert("fuzziness".into(), json!(fuzziness.max_edit_distance));
                if fuzziness.exact_prefix_length > 0 {
                    body.insert("prefix_length".into(), json!(fuzziness.exact_prefix_length));
                }
            }
            insert_analyzer(&mut body, predicate.analysis.as_ref());
        }
        insert_boost(&mut body, target_boost(&target.target, &predicate.options, single));
        clauses.push(json!({ "match": { path: body } }));
    }
    Ok(finish(
        any_of(clauses, &predicate.options, single),
        &predicate.options,
    ))
}

pub(crate) fn range(predicate: &RangePredicate) -> Result<Value> {
    let field = predicate.field.as_ref();
    let codec = field.codec()?;
    if matches!(
        codec,
        FieldCodec::Text | FieldCodec::Boolean | FieldCodec::GeoPoint
    ) {
        return Err(Error::unsupported(field.path(), "Range predicates", codec));
    }

    let mut body = Map::new();
    if let Some(RangeBound { value, inclusive }) = &predicate.lower {
        let key = if *inclusive { "gte" } else { "gt" };
        body.insert(key.into(), json_value(value));
    }
    if let Some(RangeBound { value, inclusive }) = &predicate.upper {
        let key = if *inclusive { "lte" } else { "lt" };
        body.insert(key.into(), json_value(value));
    }
    insert_boost(&mut body, scoring_boost(&predicate.options));
    Ok(finish(
        json!({ "range": { field.path(): body } }),
        &predicate.options,
    ))
}

pub(crate) fn phrase(predicate: &PhrasePredicate) -> Value {
    let single = predicate.targets.len() == 1;
    let clauses = predicate
        .targets
        .iter()
        .map(|target| {
            let mut body = Map::new();
            body.insert("query".into(), json!(predicate.text));
            if predicate.slop > 0 {
                body.insert("slop".into(), json!(predicate.slop));
            }
            insert_analyzer(&mut body, predicate.analysis.as_ref());
            insert_boost(&mut body, target_boost(target, &predicate.options, single));
            json!({ "match_phrase": { target.path(): body } })
        })
        .collect();
    finish(any_of(clauses, &predicate.options, single), &predicate.options)
}

pub(crate) fn simple_query_string(predicate: &SimpleQueryStringPredicate) -> Value {
    let fields: Vec<String> = predicate
        .targets
        .iter()
        .map(|target| match target.boost {
            Some(boost) => format!("{}^{boost}", target.path()),
            None => target.path().to_string(),
        })
        .collect();

    let mut body = Map::new();
    body.insert("query".into(), json!(predicate.effective_query()));
    body.insert("fields".into(), json!(fields));
    body.insert(
        "default_operator".into(),
        json!(predicate.default_operator.to_string()),
    );
    body.insert("flags".into(), json!(flags_value(predicate.flags)));
    insert_analyzer(&mut body, predicate.analysis.as_ref());
    insert_boost(&mut body, scoring_boost(&predicate.options));
    finish(
        json!({ "simple_query_string": body }),
        &predicate.options,
    )
}

pub(crate) fn bool(predicate: &BoolPredicate, clauses: BoolClauses<ElasticQuery>) -> Value {
    let mut body = Map::new();
    for (occur, list) in [
        ("must", clauses.must),
        ("should", clauses.should),
        ("must_not", clauses.must_not),
        ("filter", clauses.filter),
    ] {
        if !list.is_empty() {
            let list: Vec<Value> = list.into_iter().map(ElasticQuery::into_json).collect();
            body.insert(occur.into(), Value::Array(list));
        }
    }
    insert_boost(&mut body, scoring_boost(&predicate.options));
    finish(json!({ "bool": body }), &predicate.options)
}

pub(crate) fn nested(predicate: &NestedPredicate, inner: ElasticQuery) -> Value {
    json!({
        "nested": {
            "path": predicate.object_path,
            "query": inner.into_json(),
        }
    })
}

/// Restricts a query to the documents of a tenant.
pub(crate) fn scoped(query: Value, tenant_id: Option<&str>) -> Value {
    match tenant_id {
        Some(tenant) => json!({
            "bool": {
                "must": [query],
                "filter": [{ "term": { TENANT_FIELD: tenant } }],
            }
        }),
        None => query,
    }
}

/// The `flags` parameter of a simple query string.
pub fn flags_value(flags: SimpleQueryFlags) -> String {
    if flags == SimpleQueryFlags::all() {
        "ALL".to_string()
    } else if flags.is_empty() {
        "NONE".to_string()
    } else {
        flags.names().join("|")
    }
}

/// Converts a field value to JSON.
pub fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Boolean(b) => json!(b),
        FieldValue::Long(n) => json!(n),
        FieldValue::Double(n) => json!(n),
        FieldValue::String(s) => json!(s),
        FieldValue::GeoPoint(p) => json!({ "lat": p.lat, "lon": p.lon }),
    }
}

/// The boost a predicate applies to its own score, `None` under a constant
/// score.
fn scoring_boost(options: &PredicateOptions) -> Option<f32> {
    if options.constant_score {
        None
    } else {
        options.boost
    }
}

/// The boost of one target's leaf query.
///
/// A single target carries the predicate boost too; several targets leave
/// it to the enclosing `bool`.
fn target_boost(target: &FieldTarget, options: &PredicateOptions, single: bool) -> Option<f32> {
    let predicate = if single { scoring_boost(options) } else { None };
    match (target.boost, predicate) {
        (None, None) => None,
        (field, predicate) => Some(field.unwrap_or(1.0) * predicate.unwrap_or(1.0)),
    }
}

fn any_of(mut clauses: Vec<Value>, options: &PredicateOptions, single: bool) -> Value {
    if single && let Some(only) = clauses.pop() {
        return only;
    }
    let mut body = Map::new();
    body.insert("should".into(), Value::Array(clauses));
    insert_boost(&mut body, scoring_boost(options));
    json!({ "bool": body })
}

fn finish(query: Value, options: &PredicateOptions) -> Value {
    if options.constant_score {
        json!({
            "constant_score": {
                "filter": query,
                "boost": options.constant_score_value(),
            }
        })
    } else {
        query
    }
}

fn insert_boost(body: &mut Map<String, Value>, boost: Option<f32>) {
    if let Some(boost) = boost {
        body.insert("boost".into(), json!(boost));
    }
}

fn insert_analyzer(body: &mut Map<String, Value>, analysis: Option<&AnalysisOverride>) {
    if let Some(analysis) = analysis {
        body.insert("analyzer".into(), json!(analysis.analyzer_name()));
    }
}

// ============================================================================
// Tests
// ============================================================================
