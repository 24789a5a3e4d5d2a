//! Request bodies, routing and response parsing.

use std::sync::Arc;

use async_trait::async_trait;
use fathom_core::{DistanceUnit, Error, FieldValue, GeoPoint, QueryConfig, Result};
use fathom_elastic::{ElasticBackend, Routing, SearchRequest, Transport};
use fathom_query::{PredicateFinalStep, ProjectionValue, SearchScope, SessionContext};
use serde_json::{Value, json};

use crate::common::{Harness, loader, registry};

const LYON: GeoPoint = GeoPoint {
    lat: 45.76,
    lon: 4.84,
};

fn books_response() -> Value {
    json!({
        "took": 3,
        "timed_out": false,
        "_shards": { "total": 1, "successful": 1, "skipped": 0, "failed": 0 },
        "hits": {
            "total": { "value": 3, "relation": "eq" },
            "max_score": 1.2,
            "hits": [
                {
                    "_index": "books",
                    "_id": "2",
                    "_score": 1.2,
                    "_source": { "year": 1999, "genre": ["Science"] },
                    "fields": { "_fathom_distance_2": [392_000.5] }
                },
                {
                    "_index": "books",
                    "_id": "1",
                    "_score": 0.8,
                    "_source": { "year": 2001, "genre": ["Nature", "Travel"] },
                    "fields": { "_fathom_distance_2": [0.0] }
                },
                {
                    "_index": "books",
                    "_id": "3",
                    "_score": 0.5,
                    "_source": { "genre": "travel" },
                    "fields": { "_fathom_distance_2": [null] }
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_default_request_body() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 0);

    let requests = harness.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "/books,films/_search");
    assert_eq!(requests[0].routing, None);
    assert_eq!(
        requests[0].body,
        json!({
            "query": { "match_all": {} },
            "from": 0,
            "size": 10,
            "track_total_hits": true,
            "_source": false,
        })
    );
}

#[tokio::test]
async fn test_pagination_and_sorts() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.desc().missing_first().to_sort()))
        .unwrap()
        .sort_with(|s| Ok(s.distance("location", LYON)?.to_sort()))
        .unwrap()
        .sort_with(|s| Ok(s.score().to_sort()))
        .unwrap()
        .offset(20)
        .limit(5)
        .fetch()
        .await
        .unwrap();

    let body = harness.transport().last_body();
    assert_eq!(body["from"], json!(20));
    assert_eq!(body["size"], json!(5));
    assert_eq!(
        body["sort"],
        json!([
            { "year": { "order": "desc", "missing": "_first" } },
            {
                "_geo_distance": {
                    "location": { "lat": 45.76, "lon": 4.84 },
                    "order": "asc",
                    "unit": "m",
                    "distance_type": "arc",
                }
            },
            { "_score": { "order": "desc" } },
        ])
    );
    assert!(body.get("track_scores").is_none());
}

#[tokio::test]
async fn test_fetch_all_and_count() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let query = scope
        .query::<String>(loader())
        .select_entity_reference()
        .offset(100)
        .build()
        .unwrap();

    query.fetch_all().await.unwrap();
    assert_eq!(harness.transport().last_body()["size"], json!(9_900));

    query.fetch_total_hit_count().await.unwrap();
    let body = harness.transport().last_body();
    assert_eq!(body["size"], json!(0));
    assert_eq!(body["from"], json!(0));
}

#[tokio::test]
async fn test_fetch_all_past_the_result_window_fails() {
    let harness = Harness::with_response(json!({
        "hits": { "total": { "value": 12_000, "relation": "eq" }, "hits": [] }
    }));
    let scope = harness.scope(&["books"]);
    let query = scope
        .query::<String>(loader())
        .select_entity_reference()
        .build()
        .unwrap();

    let err = query.fetch_all().await.unwrap_err();
    let Error::Backend { backend, message, .. } = err else {
        unreachable!("Expected Backend error variant");
    };
    assert_eq!(backend, "elasticsearch");
    assert!(message.contains("12000 hits match"));

    // Bounded pages are unaffected.
    let page = query.fetch().await.unwrap();
    assert_eq!(page.total_hit_count, 12_000);
    assert_eq!(query.fetch_total_hit_count().await.unwrap(), 12_000);
}

#[tokio::test]
async fn test_tenant_and_routing() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let session = SessionContext::new()
        .with_tenant("acme")
        .with_capability::<Routing>("user-42".to_string());
    scope
        .query_with::<String>(session, loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let request = harness.transport().requests().pop().unwrap();
    assert_eq!(request.routing.as_deref(), Some("user-42"));
    assert_eq!(
        request.body["query"],
        json!({
            "bool": {
                "must": [{ "match": { "title": { "query": "panda" } } }],
                "filter": [{ "term": { "_tenant_id": "acme" } }],
            }
        })
    );
}

// ============================================================================
// Responses
// ============================================================================

#[tokio::test]
async fn test_projections_from_response() {
    let harness = Harness::with_response(books_response());
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![
            p.field("year").unwrap().to_projection(),
            p.field("genre").unwrap().multi().to_projection(),
            p.distance("location", LYON)
                .unwrap()
                .unit(DistanceUnit::Kilometers)
                .to_projection(),
            p.score(),
            p.document_reference(),
        ])
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let body = harness.transport().last_body();
    assert_eq!(body["_source"], json!(["year", "genre"]));
    let script = &body["script_fields"]["_fathom_distance_2"]["script"];
    assert_eq!(
        script["params"],
        json!({ "field": "location", "lat": 45.76, "lon": 4.84 })
    );

    assert_eq!(result.total_hit_count, 3);
    let rows: Vec<&Vec<ProjectionValue<String>>> = result
        .hits
        .iter()
        .map(|hit| match hit {
            ProjectionValue::List(values) => values,
            other => unreachable!("Expected a list projection, got {other:?}"),
        })
        .collect();

    assert_eq!(rows[0][0], ProjectionValue::Value(FieldValue::Long(1999)));
    assert_eq!(
        rows[1][1],
        ProjectionValue::Values(vec![FieldValue::from("Nature"), FieldValue::from("Travel")])
    );
    assert_eq!(rows[0][2], ProjectionValue::Distance(392.0005));
    assert_eq!(rows[0][3], ProjectionValue::Score(1.2));

    assert_eq!(rows[2][0], ProjectionValue::Null);
    assert_eq!(rows[2][1], ProjectionValue::Values(vec![FieldValue::from("travel")]));
    assert_eq!(rows[2][2], ProjectionValue::Null);
}

#[tokio::test]
async fn test_entities_from_response() {
    let harness = Harness::with_response(books_response());
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity()
        .fetch()
        .await
        .unwrap();

    assert_eq!(result.total_hit_count, 3);
    assert_eq!(result.failed_loads, 1);
    assert_eq!(
        result.entities(),
        vec!["Giant panda habitats".to_string(), "Feeding pandas".to_string()]
    );
}

// ============================================================================
// Failures
// ============================================================================

struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn search(&self, _request: SearchRequest) -> Result<Value> {
        Err(Error::backend("elasticsearch", "search rejected (HTTP 400): bad query"))
    }
}

#[tokio::test]
async fn test_transport_failure_is_propagated() {
    let registry = registry();
    let backend = Arc::new(ElasticBackend::new(&registry, FailingTransport));
    let scope = SearchScope::new(
        backend,
        &registry,
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
    let Error::Backend { message, .. } = err else {
        unreachable!("Expected Backend error variant");
    };
    assert!(message.contains("HTTP 400"));
}

#[tokio::test]
async fn test_malformed_response_is_a_backend_error() {
    let harness = Harness::with_response(json!({ "acknowledged": true }));
    let scope = harness.scope(&["books"]);
    let err = scope
        .query::<String>(loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap_err();
    let Error::Backend { backend, .. } = err else {
        unreachable!("Expected Backend error variant");
    };
    assert_eq!(backend, "elasticsearch");
}
