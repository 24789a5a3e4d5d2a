//! Block join over nested object documents.
//!
//! The indexer writes each nested object as a hidden document carrying its
//! object path and the key of the document holding it. A [`NestedQuery`]
//! runs its inner query over the hidden documents of one path, then matches
//! the holders of the objects that matched. Every condition of the inner
//! query therefore has to hold on the same object.
//!
//! A holder scores the average score of its matching objects.

use std::collections::BTreeMap;

use tantivy::collector::TopDocs;
use tantivy::query::{
    BooleanQuery, ConstScoreQuery, EmptyQuery, EnableScoring, Occur, Query, TermQuery, Weight,
};
use tantivy::schema::IndexRecordOption;
use tantivy::{Score, Searcher, TantivyDocument, TantivyError, Term};

use crate::collect::first_text;
use crate::schema::JoinFields;

/// Matches documents holding at least one object at `path` that matches
/// `inner`.
#[derive(Debug)]
pub(crate) struct NestedQuery {
    path: String,
    inner: Box<dyn Query>,
    join: JoinFields,
}

impl Clone for NestedQuery {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            inner: self.inner.box_clone(),
            join: self.join.clone(),
        }
    }
}

impl NestedQuery {
    pub fn new(path: impl Into<String>, inner: Box<dyn Query>, join: JoinFields) -> Self {
        Self {
            path: path.into(),
            inner,
            join,
        }
    }

    /// `inner`, restricted to the object documents of `path`.
    fn object_query(&self) -> BooleanQuery {
        let path = TermQuery::new(
            Term::from_field_text(self.join.nested, &self.path),
            IndexRecordOption::Basic,
        );
        BooleanQuery::new(vec![
            (Occur::Must, self.inner.box_clone()),
            (Occur::Must, Box::new(ConstScoreQuery::new(Box::new(path), 0.0))),
        ])
    }

    /// Average score of the matching objects, per holder key.
    fn holder_scores(&self, searcher: &Searcher) -> tantivy::Result<BTreeMap<String, Score>> {
        let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
        let matches = searcher.search(&self.object_query(), &TopDocs::with_limit(limit))?;

        let mut totals: BTreeMap<String, (Score, u32)> = BTreeMap::new();
        for (score, address) in matches {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(parent) = first_text(&doc, self.join.parent) {
                let total = totals.entry(parent).or_insert((0.0, 0));
                total.0 += score;
                total.1 += 1;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as Score))
            .collect())
    }
}

impl Query for NestedQuery {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        let searcher = enable_scoring.searcher().ok_or_else(|| {
            TantivyError::InvalidArgument(format!(
                "nested query on '{}' needs a searcher",
                self.path
            ))
        })?;
        let holders = self.holder_scores(searcher)?;
        log::trace!(
            "Nested query on '{}' matched objects of {} holders",
            self.path,
            holders.len()
        );

        if holders.is_empty() {
            return EmptyQuery.weight(enable_scoring);
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = holders
            .into_iter()
            .map(|(key, score)| {
                let holder = TermQuery::new(
                    Term::from_field_text(self.join.key, &key),
                    IndexRecordOption::Basic,
                );
                let clause: Box<dyn Query> = Box::new(ConstScoreQuery::new(Box::new(holder), score));
                (Occur::Should, clause)
            })
            .collect();
        BooleanQuery::new(clauses).weight(enable_scoring)
    }
}
