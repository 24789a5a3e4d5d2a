use fathom_core::Result;

use super::factory::{PredicateFactory, PredicateFinalStep};
use super::{BoolPredicate, PredicateNode, PredicateOptions, SearchPredicate};

/// Builder of a boolean predicate.
///
/// A boolean predicate with no clause matches every document. One with only
/// `must_not` clauses matches every document except those.
#[derive(Debug, Clone)]
pub struct BoolPredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    must: Vec<SearchPredicate>,
    should: Vec<SearchPredicate>,
    must_not: Vec<SearchPredicate>,
    filter: Vec<SearchPredicate>,
    options: PredicateOptions,
}

impl<'s> BoolPredicateBuilder<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>) -> Self {
        Self {
            factory,
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: Vec::new(),
            options: PredicateOptions::default(),
        }
    }

    /// Adds a clause that must match.
    pub fn must(mut self, predicate: SearchPredicate) -> Self {
        self.must.push(predicate);
        self
    }

    /// Adds a clause that should match.
    pub fn should(mut self, predicate: SearchPredicate) -> Self {
        self.should.push(predicate);
        self
    }

    /// Adds a clause that must not match.
    pub fn must_not(mut self, predicate: SearchPredicate) -> Self {
        self.must_not.push(predicate);
        self
    }

    /// Adds a clause that must match, ignored for scoring.
    pub fn filter(mut self, predicate: SearchPredicate) -> Self {
        self.filter.push(predicate);
        self
    }

    /// Adds a `must` clause built in place.
    pub fn must_with<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(PredicateFactory<'s>) -> Result<SearchPredicate>,
    {
        let clause = build(self.factory)?;
        Ok(self.must(clause))
    }

    /// Adds a `should` clause built in place.
    pub fn should_with<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(PredicateFactory<'s>) -> Result<SearchPredicate>,
    {
        let clause = build(self.factory)?;
        Ok(self.should(clause))
    }

    /// Multiplies the score of the predicate.
    pub fn boost(mut self, boost: f32) -> Self {
        self.options.boost = Some(boost);
        self
    }

    /// Gives every match the same score.
    pub fn constant_score(mut self) -> Self {
        self.options.constant_score = true;
        self
    }
}

impl PredicateFinalStep for BoolPredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        let scope = self.factory.scope();
        for clause in self
            .must
            .iter()
            .chain(&self.should)
            .chain(&self.must_not)
            .chain(&self.filter)
        {
            scope.check_covered_by("Predicate", clause.index_names())?;
        }
        Ok(self.factory.finish(PredicateNode::Bool(BoolPredicate {
            must: self.must,
            should: self.should,
            must_not: self.must_not,
            filter: self.filter,
            options: self.options,
        })))
    }
}
