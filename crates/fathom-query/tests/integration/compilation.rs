//! Predicate and sort compilation through a backend.

use fathom_core::{Error, GeoPoint, SortOrder};
use fathom_query::{PredicateFinalStep, SortNode};

use crate::common::{Harness, loader};

#[test]
fn test_simple_query_string_compiles_with_field_boosts() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let query = scope
        .query::<String>(loader())
        .select_entity()
        .predicate_with(|f| {
            f.simple_query_string()
                .field("title")?
                .boost(5.0)
                .field("summary")?
                .matching("panda + bamboo")?
                .to_predicate()
        })
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        query.native_predicate(),
        "sqs(title^5,summary:panda + bamboo/or)"
    );
}

#[test]
fn test_bool_children_compile_in_clause_order() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let f = scope.predicate();
    let predicate = f
        .bool()
        .must(f.match_field("genre").unwrap().matching("Science").unwrap().to_predicate().unwrap())
        .must_not(
            f.range("year")
                .unwrap()
                .less_than(1990i64)
                .unwrap()
                .to_predicate()
                .unwrap(),
        )
        .filter(
            f.phrase("title")
                .unwrap()
                .matching("giant panda")
                .unwrap()
                .slop(1)
                .to_predicate()
                .unwrap(),
        )
        .boost(2.0)
        .to_predicate()
        .unwrap();

    let query = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate(predicate)
        .build()
        .unwrap();
    assert_eq!(
        query.native_predicate(),
        "bool(must:[match(genre:Science)],must_not:[range(year:*,1990))],\
         filter:[phrase(title:\"giant panda\"~1)])^2"
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let build = || {
        scope
            .query::<String>(loader())
            .select_entity()
            .predicate_with(|f| {
                f.bool()
                    .should_with(|f| f.match_field("title")?.matching("panda")?.fuzzy()?.to_predicate())?
                    .should_with(|f| f.range("year")?.between(2000i64, 2010i64)?.constant_score().to_predicate())?
                    .to_predicate()
            })
            .unwrap()
            .sort_with(|s| Ok(s.field("year")?.desc().to_sort()))
            .unwrap()
            .build()
            .unwrap()
    };
    let first = build();
    let second = build();
    assert_eq!(first.native_predicate(), second.native_predicate());
    assert_eq!(first.native_sorts(), second.native_sorts());
    assert_eq!(
        first.native_predicate(),
        "bool(should:[match(title:panda)~2/0,const(range(year:[2000,2010]))^1])"
    );
}

#[test]
fn test_default_predicate_is_match_all() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let query = scope.query::<String>(loader()).select_entity().build().unwrap();
    assert_eq!(query.native_predicate(), "match_all");
    assert!(query.native_sorts().is_empty());
}

#[test]
fn test_nested_predicate_wraps_inner() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let query = scope
        .query::<String>(loader())
        .select_entity()
        .predicate_with(|f| {
            f.nested("authors")?
                .nest_with(|f| f.match_field("authors.name")?.matching("Ann")?.to_predicate())?
                .to_predicate()
        })
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.native_predicate(), "nested(authors:match(authors.name:Ann))");
}

#[test]
fn test_sorts_compile_in_order() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let query = scope
        .query::<String>(loader())
        .select_entity()
        .sort_with(|s| Ok(s.field("year")?.desc().missing_first().to_sort()))
        .unwrap()
        .sort_with(|s| Ok(s.distance("location", GeoPoint::new(45.0, 4.0))?.to_sort()))
        .unwrap()
        .sort_with(|s| Ok(s.score().to_sort()))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        query.native_sorts(),
        &[
            "year Desc First".to_string(),
            "distance(location) Asc".to_string(),
            "score Desc".to_string(),
        ]
    );
}

#[test]
fn test_sort_elements_keep_field_context() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let sort = scope.sort().field("year").unwrap().asc().to_sort();
    let SortNode::Field { field, order, .. } = &sort.elements()[0] else {
        unreachable!("Expected Field sort element");
    };
    assert_eq!(field.path(), "year");
    assert_eq!(*order, SortOrder::Asc);
}

// ============================================================================
// Multi-index scopes
// ============================================================================

#[test]
fn test_analyzer_conflict_requires_override() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "magazines"]);
    let f = scope.predicate();

    let err = f
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .to_predicate()
        .err()
        .unwrap();
    let Error::AnalyzerConflict { path, indexes } = err else {
        unreachable!("Expected AnalyzerConflict error variant");
    };
    assert_eq!(path, "title");
    assert_eq!(indexes, vec!["books".to_string(), "magazines".to_string()]);

    let predicate = f
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .analyzer("standard")
        .to_predicate()
        .unwrap();
    let query = scope
        .query::<String>(loader())
        .select_entity()
        .predicate(predicate)
        .build()
        .unwrap();
    assert_eq!(query.native_predicate(), "match(title:panda)@standard");

    let skipped = f
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .skip_analysis()
        .unwrap()
        .to_predicate();
    assert!(skipped.is_ok());
}

#[test]
fn test_type_conflict_is_reported_on_use() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "magazines"]);
    let err = scope.predicate().range("year").err().unwrap();
    let Error::FieldTypeConflict { path, .. } = err else {
        unreachable!("Expected FieldTypeConflict error variant");
    };
    assert_eq!(path, "year");

    // Fields without conflicts stay usable.
    assert!(scope.predicate().match_field("summary").is_ok());
}

#[test]
fn test_predicate_for_narrower_scope_is_rejected() {
    let harness = Harness::new();
    let books = harness.scope(&["books"]);
    let both = harness.scope(&["books", "films"]);
    let predicate = books
        .predicate()
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .to_predicate()
        .unwrap();

    let err = both
        .query::<String>(loader())
        .select_entity()
        .predicate(predicate)
        .build()
        .err()
        .unwrap();
    let Error::IndexScopeMismatch { kind, declared, requested } = err else {
        unreachable!("Expected IndexScopeMismatch error variant");
    };
    assert_eq!(kind, "Predicate");
    assert_eq!(declared, vec!["books".to_string()]);
    assert_eq!(requested, vec!["books".to_string(), "films".to_string()]);
}

#[test]
fn test_predicate_for_wider_scope_is_accepted() {
    let harness = Harness::new();
    let books = harness.scope(&["books"]);
    let both = harness.scope(&["books", "films"]);
    let predicate = both
        .predicate()
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .to_predicate()
        .unwrap();
    let query = books
        .query::<String>(loader())
        .select_entity()
        .predicate(predicate)
        .build();
    assert!(query.is_ok());
}

#[test]
fn test_projection_for_narrower_scope_is_rejected() {
    let harness = Harness::new();
    let books = harness.scope(&["books"]);
    let both = harness.scope(&["books", "films"]);
    let projection = books.projection::<String>().field("title").unwrap().to_projection();

    let err = both
        .query::<String>(loader())
        .select(projection)
        .build()
        .err()
        .unwrap();
    let Error::IndexScopeMismatch { kind, .. } = err else {
        unreachable!("Expected IndexScopeMismatch error variant");
    };
    assert_eq!(kind, "Projection");
}
