//! Relevance: boosts, constant scores and score projections.

use fathom_query::{PredicateFinalStep, ProjectionValue};

use crate::common::{Harness, ids, loader};

async fn ranked(harness: &Harness, panda_boost: f32, word_boost: f32) -> Vec<String> {
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.bool()
                .should_with(|f| {
                    f.match_field("title")?
                        .matching("panda")?
                        .boost(panda_boost)
                        .to_predicate()
                })?
                .should_with(|f| {
                    f.match_field("title")?
                        .matching("word")?
                        .boost(word_boost)
                        .to_predicate()
                })?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    ids(&result)
}

fn position(ids: &[String], id: &str) -> usize {
    ids.iter().position(|i| i == id).unwrap()
}

#[tokio::test]
async fn test_boost_reorders_hits() {
    let harness = Harness::new();

    let word_first = ranked(&harness, 1.0, 10.0).await;
    assert_eq!(word_first.len(), 3);
    assert!(position(&word_first, "books/3") < position(&word_first, "books/2"));

    let panda_first = ranked(&harness, 10.0, 1.0).await;
    assert!(position(&panda_first, "books/2") < position(&panda_first, "books/3"));
}

#[tokio::test]
async fn test_constant_score_ignores_term_statistics() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let result = scope
        .query::<String>(loader())
        .select_entity_reference()
        .predicate_with(|f| {
            f.bool()
                .should_with(|f| {
                    f.match_field("title")?
                        .matching("panda")?
                        .constant_score()
                        .to_predicate()
                })?
                .should_with(|f| {
                    f.match_field("title")?
                        .matching("word")?
                        .constant_score()
                        .boost(5.0)
                        .to_predicate()
                })?
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();
    // 1 + 5, then 5, then 1.
    assert_eq!(ids(&result), vec!["books/1", "books/3", "books/2"]);
}

#[tokio::test]
async fn test_score_projection() {
    let harness = Harness::new();
    let scope = harness.scope(&["books"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![p.document_reference(), p.score()])
        .unwrap()
        .predicate_with(|f| {
            f.match_field("genre")?
                .matching("science")?
                .constant_score()
                .boost(2.0)
                .to_predicate()
        })
        .unwrap()
        .fetch()
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["books/2"]);
    let ProjectionValue::List(values) = &result.hits[0] else {
        unreachable!("Expected a list projection");
    };
    assert_eq!(values[1], ProjectionValue::Score(2.0));
}

#[tokio::test]
async fn test_relevance_scores_are_descending() {
    let harness = Harness::new();
    let scope = harness.scope(&["books", "films"]);
    let p = scope.projection::<String>();
    let result = scope
        .query::<String>(loader())
        .select_list(vec![p.document_reference(), p.score()])
        .unwrap()
        .predicate_with(|f| f.match_field("title")?.matching("panda")?.to_predicate())
        .unwrap()
        .fetch()
        .await
        .unwrap();

    let scores: Vec<f32> = result
        .hits
        .iter()
        .map(|hit| match hit {
            ProjectionValue::List(values) => match values[1] {
                ProjectionValue::Score(score) => score,
                ref other => unreachable!("Expected a score, got {other:?}"),
            },
            other => unreachable!("Expected a list projection, got {other:?}"),
        })
        .collect();
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().all(|s| *s > 0.0));
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}
