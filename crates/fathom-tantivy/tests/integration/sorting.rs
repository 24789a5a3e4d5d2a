//! Sorts, pagination, field and distance projections, entity loading.

use fathom_core::{DistanceUnit, FieldValue};
use fathom_query::{PredicateFinalStep, ProjectionValue};

use crate::common::{Harness, LYON, ids, loader};

#[tokio::test]
async fn test_field_sort_and_missing_values() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);

    let desc = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.desc().to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&desc), vec!["books/3", "books/1", "books/2", "books/4"]);

    let missing_first = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.desc().missing_first().to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(
        ids(&missing_first),
        vec!["books/4", "books/3", "books/1", "books/2"]
    );

    let asc = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&asc), vec!["books/2", "books/1", "books/3", "books/4"]);
}

#[tokio::test]
async fn test_multi_valued_sort_uses_smallest_value_ascending() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("genre")?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    // books/1 holds "Nature" and "Travel".
    assert_eq!(ids(&result), vec!["books/1", "books/2", "books/3", "books/4"]);
}

#[tokio::test]
async fn test_sort_across_indexes() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(
        ids(&result),
        vec!["books/2", "books/1", "films/1", "books/3", "films/2", "books/4"]
    );
}

#[tokio::test]
async fn test_score_then_field_sort() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.match_field("genre")?
                .matching("travel")?
                .constant_score()
                .to_predicate()
        })
        .unwrap()
        .sort_with(|s| Ok(s.score().to_sort()))
        .unwrap()
        .sort_with(|s| Ok(s.field("year")?.desc().to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();
    // Equal constant scores; the year breaks the tie.
    assert_eq!(ids(&result), vec!["books/3", "books/1"]);
}

#[tokio::test]
async fn test_distance_sort_and_projection() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![
            p.document_reference(),
            p.distance("location", LYON)
                .unwrap()
                .unit(DistanceUnit::Kilometers)
                .to_projection(),
        ])
        .unwrap()
        .sort_with(|s| Ok(s.distance("location", LYON)?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let ids = ids(&result);
    assert_eq!(ids[..2], ["books/1", "books/2"]);

    let distances: Vec<&ProjectionValue<String>> = result
        .hits
        .iter()
        .map(|hit| match hit {
            ProjectionValue::List(values) => &values[1],
            other => unreachable!("Expected a list projection, got {other:?}"),
        })
        .collect();
    let ProjectionValue::Distance(lyon) = distances[0] else {
        unreachable!("Expected a distance");
    };
    assert!(*lyon < 0.001);
    let ProjectionValue::Distance(paris) = distances[1] else {
        unreachable!("Expected a distance");
    };
    assert!((380.0..400.0).contains(paris), "got {paris} km");
    assert_eq!(*distances[2], ProjectionValue::Null);
}

// ============================================================================
// Pagination and counting
// ============================================================================

#[tokio::test]
async fn test_offset_and_limit_with_sort() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .sort_with(|s| Ok(s.field("year")?.to_sort()))
        .unwrap()
        .offset(1)
        .limit(2)
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 4);
    assert_eq!(ids(&result), vec!["books/1", "books/3"]);
}

#[tokio::test]
async fn test_offset_past_the_end() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .offset(10)
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 4);
    assert!(result.hits.is_empty());
}

#[tokio::test]
async fn test_total_hit_count_and_refetch() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let query = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())
        .unwrap()
        .limit(1)
        .build()
        .unwrap();

    assert_eq!(query.fetch_total_hit_count().await.unwrap(), 4);
    let first = query.fetch().await.unwrap();
    let again = query.fetch().await.unwrap();
    assert_eq!(first.hits.len(), 1);
    assert_eq!(ids(&first), ids(&again));
    assert_eq!(query.fetch_all().await.unwrap().hits.len(), 4);
}

// ============================================================================
// Field projections and entities
// ============================================================================

#[tokio::test]
async fn test_field_projections() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![
            p.document_reference(),
            p.field("year").unwrap().to_projection(),
            p.field("price").unwrap().to_projection(),
            p.field("genre").unwrap().multi().to_projection(),
        ])
        .unwrap()
        .sort_with(|s| Ok(s.field("year")?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let ProjectionValue::List(books_1) = &result.hits[1] else {
        unreachable!("Expected a list projection");
    };
    assert_eq!(books_1[1], ProjectionValue::Value(FieldValue::Long(2001)));
    assert_eq!(books_1[2], ProjectionValue::Value(FieldValue::Double(12.5)));
    assert_eq!(
        books_1[3],
        ProjectionValue::Values(vec![FieldValue::from("Nature"), FieldValue::from("Travel")])
    );

    let ProjectionValue::List(books_4) = &result.hits[3] else {
        unreachable!("Expected a list projection");
    };
    assert_eq!(books_4[1], ProjectionValue::Null);
    assert_eq!(books_4[3], ProjectionValue::Values(Vec::new()));
}

#[tokio::test]
async fn test_entities_with_failed_loads_skipped() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity()
        .sort_with(|s| Ok(s.field("year")?.to_sort()))
        .unwrap()
        .fetch()
        .await
        .unwrap();

    assert_eq!(result.total_hit_count, 4);
    assert_eq!(result.failed_loads, 2);
    assert_eq!(
        result.entities(),
        vec!["Giant panda habitats".to_string(), "Feeding pandas".to_string()]
    );
}
