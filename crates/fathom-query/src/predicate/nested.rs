use fathom_core::{Error, Result};

use super::factory::{PredicateFactory, PredicateFinalStep};
use super::{NestedPredicate, PredicateNode, SearchPredicate};

/// Builder of a nested predicate.
///
/// The inner predicate must only reference fields of the nested object, so
/// that it is evaluated against one object at a time.
#[derive(Debug, Clone)]
pub struct NestedPredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    object_path: String,
    inner: Option<SearchPredicate>,
}

impl<'s> NestedPredicateBuilder<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>, object_path: &str) -> Self {
        Self {
            factory,
            object_path: object_path.to_string(),
            inner: None,
        }
    }

    /// Sets the predicate applied to each nested object.
    pub fn nest(mut self, predicate: SearchPredicate) -> Self {
        self.inner = Some(predicate);
        self
    }

    /// Builds the inner predicate in place.
    pub fn nest_with<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(PredicateFactory<'s>) -> Result<SearchPredicate>,
    {
        let inner = build(self.factory)?;
        Ok(self.nest(inner))
    }
}

impl PredicateFinalStep for NestedPredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        let inner = self.inner.ok_or_else(|| {
            Error::invalid_argument(format!(
                "nested predicate on '{}' has no inner predicate",
                self.object_path
            ))
        })?;
        self.factory
            .scope()
            .check_covered_by("Predicate", inner.index_names())?;
        let prefix = format!("{}.", self.object_path);
        if let Some(outside) = inner.field_paths().into_iter().find(|p| !p.starts_with(&prefix)) {
            return Err(Error::invalid_argument(format!(
                "field '{outside}' is not part of nested object '{}'",
                self.object_path
            )));
        }
        Ok(self.factory.finish(PredicateNode::Nested(NestedPredicate {
            object_path: self.object_path,
            inner,
        })))
    }
}
