//! Match, range, phrase and boolean predicates; scopes and tenants.

use fathom_core::Error;
use fathom_query::{PredicateFinalStep, SessionContext};

use crate::common::{Harness, ids, loader, sorted_ids};

#[tokio::test]
async fn test_match_analyzes_text() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("PANDAS panda")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/2"]);
}

#[tokio::test]
async fn test_match_stop_words_only_finds_nothing() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("the")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 0);
}

#[tokio::test]
async fn test_match_keyword_uses_normalizer() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("genre")?.matching("TRAVEL")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/3"]);
}

#[tokio::test]
async fn test_match_numbers_and_booleans() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let year = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("year")?.matching(1999)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&year), vec!["books/2"]);

    let available = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("available")?.matching(true)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&available), vec!["books/1"]);

    // Scaled numbers are rounded to their scale before matching.
    let price = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("price")?.matching(12.501)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&price), vec!["books/1"]);
}

#[tokio::test]
async fn test_fuzzy_match() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let fuzzy = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("pamda")?.fuzzy()?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&fuzzy), vec!["books/1", "books/2"]);

    // The first two characters must match exactly.
    let prefixed = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.match_field("title")?
                .matching("bamda")?
                .fuzzy_with(1, 2)?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(prefixed.total_hit_count, 0);
}

#[tokio::test]
async fn test_range() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let between = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.range("year")?.between(1999, 2001)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&between), vec!["books/1", "books/2"]);

    let above = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.range("year")?.greater_than(2001)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&above), vec!["books/3"]);

    let keyword = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.range("genre")?.at_least("S")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&keyword), vec!["books/1", "books/2", "books/3"]);
}

#[tokio::test]
async fn test_phrase_slop() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let exact = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.phrase("title")?.matching("giant habitats")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(exact.total_hit_count, 0);

    let sloppy = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.phrase("title")?.matching("giant habitats")?.slop(1).to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&sloppy), vec!["books/2"]);

    // Removed stop words keep their position.
    let gap = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.phrase("title")?.matching("word in mountain")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&gap), vec!["books/3"]);
}

// ============================================================================
// Boolean predicates
// ============================================================================

#[tokio::test]
async fn test_bool_must_and_must_not() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.bool()
                .must_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())?
                .must_not(f.match_field("genre")?.matching("science")?.to_predicate()?)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&result), vec!["books/1"]);
}

#[tokio::test]
async fn test_bool_negative_only_matches_everything_else() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.bool()
                .must_not(f.match_field("title")?.matching("panda")?.to_predicate()?)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/3", "books/4"]);
}

#[tokio::test]
async fn test_bool_filter_does_not_score() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![p.document_reference(), p.score()])
        .unwrap()
        .predicate_with(|f| {
            f.bool()
                .filter(f.range("year")?.at_least(2000)?.to_predicate()?)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/3"]);
    for hit in &result.hits {
        let fathom_query::ProjectionValue::List(values) = hit else {
            unreachable!("Expected a list projection");
        };
        assert_eq!(values[1], fathom_query::ProjectionValue::Score(0.0));
    }
}

#[tokio::test]
async fn test_empty_bool_and_match_all() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let empty = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.bool().to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(empty.total_hit_count, 4);

    let except = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.match_all()
                .except(f.match_field("genre")?.matching("travel")?.to_predicate()?)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&except), vec!["books/2", "books/4"]);
}

#[tokio::test]
async fn test_scope_restricts_indexes() {
    let harness = Harness::new();
    let books = harness.scope(&["books"]);
    let result = books
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&result), vec!["books/1", "books/2"]);

    let both = harness.scope(&["books", "films"]);
    let result = both
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(
        sorted_ids(&result),
        vec!["books/1", "books/2", "films/1", "films/2"]
    );
}

#[tokio::test]
async fn test_field_missing_from_some_indexes() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| f.match_field("available")?.matching(false)?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&result), vec!["books/2"]);
}

#[tokio::test]
async fn test_analyzer_conflict_resolved_by_override() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "magazines"]);

    let err = scope
        .predicate()
        .match_field("title")
        .unwrap()
        .matching("panda")
        .unwrap()
        .to_predicate()
        .unwrap_err();
    let Error::AnalyzerConflict { path, .. } = err else {
        unreachable!("Expected AnalyzerConflict error variant");
    };
    assert_eq!(path, "title");

    let overridden = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.match_field("title")?
                .matching("Panda")?
                .analyzer("standard")
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(
        sorted_ids(&overridden),
        vec!["books/1", "books/2", "magazines/1"]
    );

    let skipped = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.match_field("title")?
                .matching("panda")?
                .skip_analysis()?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(sorted_ids(&skipped), sorted_ids(&overridden));
}

#[tokio::test]
async fn test_tenant_filter() {
    let harness = Harness::new();
    let scope = harness.scope(&["films"]);
    let result = scope
        .query_with::<String>(SessionContext::new().with_tenant("acme"), loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap();
    assert_eq!(ids(&result), vec!["films/2"]);

    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .fetch()
        .await
        .unwrap();
    assert_eq!(result.total_hit_count, 2);
}
