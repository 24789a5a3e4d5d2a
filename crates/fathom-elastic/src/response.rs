//! Search response parsing.

use std::collections::HashMap;

use fathom_core::{FieldCodec, FieldValue, GeoPoint, Result, SchemaRegistry};
use fathom_query::{DocumentReference, HitRequirement, RawHit, RawSearchResult, RawValue};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{BACKEND_NAME, elastic_error};
use crate::request::distance_field;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    timed_out: bool,
    #[serde(rename = "_shards", default)]
    shards: Option<Shards>,
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Shards {
    #[serde(default)]
    failed: u64,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
    #[serde(default)]
    fields: HashMap<String, Vec<Value>>,
}

/// Codecs of every (index, path) pair, for decoding `_source` values.
#[derive(Debug, Clone, Default)]
pub(crate) struct CodecTable {
    codecs: HashMap<String, HashMap<String, FieldCodec>>,
}

impl CodecTable {
    pub fn build(registry: &SchemaRegistry) -> Self {
        let codecs = registry
            .indexes()
            .map(|schema| {
                let fields = schema
                    .fields()
                    .map(|(path, descriptor)| (path.to_string(), descriptor.codec()))
                    .collect();
                (schema.name().to_string(), fields)
            })
            .collect();
        Self { codecs }
    }

    /// The codec of `path` in `index`, falling back to the targeted indexes
    /// when `index` is a concrete index behind an alias.
    fn codec(&self, index: &str, path: &str, targeted: &[String]) -> Option<FieldCodec> {
        let lookup = |name: &str| self.codecs.get(name).and_then(|f| f.get(path)).copied();
        lookup(index).or_else(|| targeted.iter().find_map(|name| lookup(name)))
    }
}

/// Parses a search response into raw hits.
pub(crate) fn parse(
    response: Value,
    requirements: &[HitRequirement],
    track_scores: bool,
    targeted: &[String],
    codecs: &CodecTable,
) -> Result<RawSearchResult> {
    let response: SearchResponse = serde_json::from_value(response)
        .map_err(|e| elastic_error("malformed search response", e))?;
    if response.timed_out {
        log::warn!("Search on [{}] timed out; hits may be partial", targeted.join(", "));
    }
    if let Some(shards) = &response.shards
        && shards.failed > 0
    {
        log::warn!(
            "{} shards failed for search on [{}]",
            shards.failed,
            targeted.join(", ")
        );
    }

    let total_hit_count = match response.hits.total {
        Some(TotalHits::Count(n)) | Some(TotalHits::Object { value: n }) => n,
        None => response.hits.hits.len() as u64,
    };
    let hits = response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let values = requirements
                .iter()
                .enumerate()
                .map(|(slot, requirement)| match requirement {
                    HitRequirement::FieldValues { path } => {
                        let codec = codecs.codec(&hit.index, path, targeted);
                        let values = hit
                            .source
                            .as_ref()
                            .zip(codec)
                            .map(|(source, codec)| source_values(source, path, codec))
                            .unwrap_or_default();
                        if values.is_empty() {
                            RawValue::Missing
                        } else {
                            RawValue::Values(values)
                        }
                    }
                    HitRequirement::Distance { .. } => hit
                        .fields
                        .get(&distance_field(slot))
                        .and_then(|values| values.first())
                        .and_then(Value::as_f64)
                        .map_or(RawValue::Missing, RawValue::Distance),
                })
                .collect();
            RawHit {
                reference: DocumentReference::new(hit.index, hit.id),
                score: if track_scores { hit.score } else { None },
                values,
            }
        })
        .collect();

    log::trace!("Parsed {BACKEND_NAME} response with {total_hit_count} total hits");
    Ok(RawSearchResult {
        total_hit_count,
        hits,
    })
}

/// Values of a dotted path in a `_source` document.
fn source_values(source: &Value, path: &str, codec: FieldCodec) -> Vec<FieldValue> {
    let mut nodes = vec![source];
    for segment in path.split('.') {
        nodes = nodes
            .into_iter()
            .flat_map(|node| match node {
                Value::Array(items) => items.iter().filter_map(|i| i.get(segment)).collect(),
                other => other.get(segment).into_iter().collect::<Vec<_>>(),
            })
            .collect();
    }
    nodes
        .into_iter()
        .flat_map(|node| leaf_values(node, codec))
        .collect()
}

fn leaf_values(node: &Value, codec: FieldCodec) -> Vec<FieldValue> {
    match node {
        Value::Null => Vec::new(),
        // A `[lon, lat]` pair is one point, not two values.
        Value::Array(items) if codec == FieldCodec::GeoPoint && lon_lat(items).is_some() => {
            lon_lat(items).map(FieldValue::GeoPoint).into_iter().collect()
        }
        Value::Array(items) => items.iter().flat_map(|i| leaf_values(i, codec)).collect(),
        scalar => decode(scalar, codec).into_iter().collect(),
    }
}

fn decode(value: &Value, codec: FieldCodec) -> Option<FieldValue> {
    match codec {
        FieldCodec::Text | FieldCodec::Keyword => match value {
            Value::String(s) => Some(FieldValue::from(s.as_str())),
            other => Some(FieldValue::String(other.to_string())),
        },
        FieldCodec::Long => value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(FieldValue::Long),
        FieldCodec::Double | FieldCodec::ScaledNumber { .. } => value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(FieldValue::Double),
        FieldCodec::Boolean => value
            .as_bool()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(FieldValue::Boolean),
        FieldCodec::GeoPoint => match value {
            Value::Object(_) => Some(GeoPoint::new(
                value.get("lat")?.as_f64()?,
                value.get("lon")?.as_f64()?,
            )),
            Value::String(s) => {
                let (lat, lon) = s.split_once(',')?;
                Some(GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?))
            }
            _ => None,
        }
        .map(FieldValue::GeoPoint),
    }
}

fn lon_lat(items: &[Value]) -> Option<GeoPoint> {
    match items {
        [lon, lat] => Some(GeoPoint::new(lat.as_f64()?, lon.as_f64()?)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
