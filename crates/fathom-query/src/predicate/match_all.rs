use fathom_core::Result;

use super::factory::{PredicateFactory, PredicateFinalStep};
use super::{BoolPredicate, MatchAllPredicate, PredicateNode, PredicateOptions, SearchPredicate};

/// Builder of a match-all predicate.
#[derive(Debug, Clone)]
pub struct MatchAllPredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    except: Vec<SearchPredicate>,
    options: PredicateOptions,
}

impl<'s> MatchAllPredicateBuilder<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>) -> Self {
        Self {
            factory,
            except: Vec::new(),
            options: PredicateOptions::default(),
        }
    }

    /// Excludes documents matching `predicate`.
    pub fn except(mut self, predicate: SearchPredicate) -> Self {
        self.except.push(predicate);
        self
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

impl PredicateFinalStep for MatchAllPredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        let all = self.factory.finish(PredicateNode::MatchAll(MatchAllPredicate {
            options: self.options,
        }));
        if self.except.is_empty() {
            return Ok(all);
        }
        let scope = self.factory.scope();
        for p in &self.except {
            scope.check_covered_by("Predicate", p.index_names())?;
        }
        Ok(self.factory.finish(PredicateNode::Bool(BoolPredicate {
            must: vec![all],
            should: Vec::new(),
            must_not: self.except,
            filter: Vec::new(),
            options: PredicateOptions::default(),
        })))
    }
}
