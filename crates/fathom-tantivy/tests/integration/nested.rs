//! Nested object predicates.

use fathom_core::{
    AnalysisRegistry, FieldDescriptor, FieldValue, IndexSchema, ObjectStructure, SchemaRegistry,
};
use fathom_query::{PredicateFinalStep, ProjectionValue, SearchResult};
use fathom_tantivy::{Document, NestedObject};

use crate::common::{Harness, loader, sorted_ids};

fn registry() -> SchemaRegistry {
    SchemaRegistry::new(AnalysisRegistry::default())
        .with_index(
            IndexSchema::new("books")
                .with_field("title", FieldDescriptor::text("standard_english"))
                .with_field("authors.first", FieldDescriptor::keyword())
                .with_field("authors.last", FieldDescriptor::keyword())
                .with_field("authors.awards.name", FieldDescriptor::keyword())
                .with_field("authors.awards.year", FieldDescriptor::long())
                .with_object("authors", ObjectStructure::Nested)
                .with_object("authors.awards", ObjectStructure::Nested),
        )
        .unwrap()
}

fn author(first: &str, last: &str) -> NestedObject {
    NestedObject::new().field("first", first).field("last", last)
}

fn award(name: &str, year: i64) -> NestedObject {
    NestedObject::new().field("name", name).field("year", year)
}

fn harness() -> Harness {
    Harness::with_corpus(
        registry(),
        vec![
            Document::new("books", "1")
                .field("title", "Panda tales")
                .nested("authors", author("John", "Smith").nested("awards", award("Hugo", 1990)))
                .nested("authors", author("Jane", "Doe").nested("awards", award("Nebula", 2001))),
            Document::new("books", "2")
                .field("title", "Bamboo forests")
                .nested("authors", author("John", "Doe").nested("awards", award("Nebula", 1990))),
            Document::new("books", "3").field("title", "Anonymous pandas"),
        ],
    )
}

async fn authored_by(harness: &Harness, first: &str, last: &str) -> SearchResult<String> {
    harness
        .scope(&["books"])
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.nested("authors")?
                .nest_with(|f| {
                    f.bool()
                        .must(f.match_field("authors.first")?.matching(first)?.to_predicate()?)
                        .must(f.match_field("authors.last")?.matching(last)?.to_predicate()?)
                        .to_predicate()
                })?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_conditions_must_hold_on_the_same_object() {
    let harness = harness();

    // books/1 has a John and a Doe, but no John Doe.
    let result = authored_by(&harness, "John", "Doe").await;
    assert_eq!(sorted_ids(&result), vec!["books/2"]);

    let result = authored_by(&harness, "Jane", "Smith").await;
    assert_eq!(result.total_hit_count, 0);
    assert!(result.hits.is_empty());
}

#[tokio::test]
async fn test_objects_matching_on_their_own() {
    let harness = harness();
    let result = authored_by(&harness, "John", "Smith").await;
    assert_eq!(sorted_ids(&result), vec!["books/1"]);

    let result = authored_by(&harness, "Jane", "Doe").await;
    assert_eq!(sorted_ids(&result), vec!["books/1"]);
}

#[tokio::test]
async fn test_any_object_may_match() {
    let harness = harness();
    let result = harness
        .scope(&["books"])
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.nested("authors")?
                .nest_with(|f| f.match_field("authors.last")?.matching("Doe")?.to_predicate())?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/2"]);
}

#[tokio::test]
async fn test_flat_predicates_see_every_object() {
    let harness = harness();
    let result = harness
        .scope(&["books"])
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.bool()
                .must(f.match_field("authors.first")?.matching("Jane")?.to_predicate()?)
                .must(f.match_field("authors.last")?.matching("Smith")?.to_predicate()?)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1"]);
}

#[tokio::test]
async fn test_nested_within_nested() {
    let harness = harness();
    // A Doe who won a Nebula in 1990: only the John Doe of books/2.
    let result = harness
        .scope(&["books"])
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.nested("authors")?
                .nest_with(|f| {
                    f.bool()
                        .must(f.match_field("authors.last")?.matching("Doe")?.to_predicate()?)
                        .must(
                            f.nested("authors.awards")?
                                .nest_with(|f| {
                                    f.bool()
                                        .must(
                                            f.match_field("authors.awards.name")?
                                                .matching("Nebula")?
                                                .to_predicate()?,
                                        )
                                        .must(
                                            f.match_field("authors.awards.year")?
                                                .matching(1990)?
                                                .to_predicate()?,
                                        )
                                        .to_predicate()
                                })?
                                .to_predicate()?,
                        )
                        .to_predicate()
                })?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/2"]);
}

#[tokio::test]
async fn test_nested_objects_are_never_hits() {
    let harness = harness();
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![
            p.document_reference(),
            p.field("authors.last").unwrap().multi().to_projection(),
        ])
        .unwrap()
        .build()
        .unwrap()
        .fetch_all()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 3);
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/2", "books/3"]);

    let lasts: Vec<&ProjectionValue<String>> = result
        .hits
        .iter()
        .map(|hit| match hit {
            ProjectionValue::List(values) => &values[1],
            other => unreachable!("Expected a list projection, got {other:?}"),
        })
        .collect();
    assert!(lasts.contains(&&ProjectionValue::Values(vec![
        FieldValue::from("Smith"),
        FieldValue::from("Doe"),
    ])));
}
