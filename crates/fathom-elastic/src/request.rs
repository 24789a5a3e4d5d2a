//! Search request bodies.

use fathom_query::{HitRequirement, NativeSearchRequest};
use serde_json::{Map, Value, json};

use crate::compile::{ElasticQuery, scoped};
use crate::sort::ElasticSort;

/// Largest `from + size` the engine accepts by default.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Prefix of the script fields computing distances.
pub(crate) const DISTANCE_FIELD_PREFIX: &str = "_fathom_distance_";

/// Painless script computing the arc distance to a center, in meters.
const DISTANCE_SCRIPT: &str = "doc[params.field].size() == 0 ? null : \
                               doc[params.field].arcDistance(params.lat, params.lon)";

/// A search request ready for a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Targeted indexes.
    pub indexes: Vec<String>,
    /// Shard routing key, if the session provides one.
    pub routing: Option<String>,
    /// Request body.
    pub body: Value,
}

impl SearchRequest {
    /// The `_search` endpoint path of the targeted indexes.
    pub fn path(&self) -> String {
        format!("/{}/_search", self.indexes.join(","))
    }
}

/// Builds the body of a search request.
pub(crate) fn body(request: &NativeSearchRequest<ElasticQuery, ElasticSort>) -> Value {
    let query = scoped(
        request.predicate.as_json().clone(),
        request.session.tenant_id(),
    );
    let size = match request.limit {
        Some(limit) => limit,
        None => MAX_RESULT_WINDOW.saturating_sub(request.offset),
    };

    let mut body = Map::new();
    body.insert("query".into(), query);
    body.insert("from".into(), json!(request.offset));
    body.insert("size".into(), json!(size));
    body.insert("track_total_hits".into(), json!(true));
    if !request.sorts.is_empty() {
        let sorts: Vec<Value> = request.sorts.iter().map(|s| s.as_json().clone()).collect();
        body.insert("sort".into(), Value::Array(sorts));
        if request.track_scores && !request.sorts.iter().any(ElasticSort::is_score) {
            body.insert("track_scores".into(), json!(true));
        }
    }

    let mut source = Vec::new();
    let mut script_fields = Map::new();
    for (slot, requirement) in request.requirements.iter().enumerate() {
        match requirement {
            HitRequirement::FieldValues { path } => {
                if !source.contains(path) {
                    source.push(path.clone());
                }
            }
            HitRequirement::Distance { path, center } => {
                script_fields.insert(
                    distance_field(slot),
                    json!({
                        "script": {
                            "source": DISTANCE_SCRIPT,
                            "params": { "field": path, "lat": center.lat, "lon": center.lon },
                        }
                    }),
                );
            }
        }
    }
    if source.is_empty() {
        body.insert("_source".into(), json!(false));
    } else {
        body.insert("_source".into(), json!(source));
    }
    if !script_fields.is_empty() {
        body.insert("script_fields".into(), Value::Object(script_fields));
    }
    Value::Object(body)
}

/// Name of the script field computing requirement `slot`.
pub(crate) fn distance_field(slot: usize) -> String {
    format!("{DISTANCE_FIELD_PREFIX}{slot}")
}
