use std::sync::Arc;

use fathom_core::{
    Error, FieldCodec, FieldContext, FieldValue, IndexScope, ObjectStructure, QueryConfig, Result,
};

use super::{
    AnalysisOverride, BoolPredicateBuilder, FieldTarget, MatchAllPredicateBuilder, MatchFieldStep,
    NestedPredicateBuilder, PhraseFieldStep, RangeFieldStep, SearchPredicate,
    SimpleQueryStringFieldStep,
};

/// The last step of every predicate builder.
pub trait PredicateFinalStep {
    /// Validates the options and produces the immutable predicate.
    fn to_predicate(self) -> Result<SearchPredicate>;
}

/// Entry point of the predicate DSL, bound to one index scope.
#[derive(Debug, Clone, Copy)]
pub struct PredicateFactory<'s> {
    scope: &'s IndexScope,
    config: &'s QueryConfig,
}

impl<'s> PredicateFactory<'s> {
    /// Creates a factory for `scope`.
    pub fn new(scope: &'s IndexScope, config: &'s QueryConfig) -> Self {
        Self { scope, config }
    }

    /// The scope predicates are built for.
    pub fn scope(&self) -> &'s IndexScope {
        self.scope
    }

    pub(crate) fn config(&self) -> &'s QueryConfig {
        self.config
    }

    /// Matches every document.
    pub fn match_all(&self) -> MatchAllPredicateBuilder<'s> {
        MatchAllPredicateBuilder::new(*self)
    }

    /// Matches a value in one field.
    pub fn match_field(&self, path: &str) -> Result<MatchFieldStep<'s>> {
        MatchFieldStep::new(*self, path)
    }

    /// Matches a value in any of several fields.
    pub fn match_fields(&self, paths: &[&str]) -> Result<MatchFieldStep<'s>> {
        let (first, rest) = paths
            .split_first()
            .ok_or_else(|| Error::invalid_argument("a match predicate needs at least one field"))?;
        rest.iter()
            .try_fold(self.match_field(first)?, |step, path| step.field(path))
    }

    /// Matches values in a range.
    pub fn range(&self, path: &str) -> Result<RangeFieldStep<'s>> {
        RangeFieldStep::new(*self, path)
    }

    /// Matches a phrase in one field.
    pub fn phrase(&self, path: &str) -> Result<PhraseFieldStep<'s>> {
        PhraseFieldStep::new(*self, path)
    }

    /// Matches a simple query string; add fields with `field()`.
    pub fn simple_query_string(&self) -> SimpleQueryStringFieldStep<'s> {
        SimpleQueryStringFieldStep::new(*self)
    }

    /// Combines predicates with boolean clauses.
    pub fn bool(&self) -> BoolPredicateBuilder<'s> {
        BoolPredicateBuilder::new(*self)
    }

    /// Matches documents with a nested object satisfying a predicate.
    pub fn nested(&self, object_path: &str) -> Result<NestedPredicateBuilder<'s>> {
        match self.scope.object_structure(object_path)? {
            ObjectStructure::Nested => Ok(NestedPredicateBuilder::new(*self, object_path)),
            ObjectStructure::Flattened => Err(Error::unsupported(
                object_path,
                "Nested predicates",
                "flattened object",
            )),
        }
    }

    /// Resolves a field usable in predicates.
    ///
    /// Checks, in order: existence, type agreement across indexes,
    /// searchability.
    pub(crate) fn searchable_field(&self, path: &str) -> Result<(Arc<FieldContext>, FieldCodec)> {
        let field = self.scope.field(path)?;
        let codec = field.codec()?;
        field.require_searchable()?;
        Ok((Arc::clone(field), codec))
    }

    /// Resolves a field holding character data, for text predicates.
    pub(crate) fn text_field(&self, path: &str, kind: &str) -> Result<FieldTarget> {
        let (field, codec) = self.searchable_field(path)?;
        if !codec.is_text_like() {
            return Err(Error::unsupported(path, kind, codec));
        }
        Ok(FieldTarget::new(field))
    }

    /// Checks analysis-related metadata once all options are known.
    ///
    /// Without an override, the fields must agree on their search analyzer
    /// and normalizer. With one, the analyzer must exist and declared
    /// analyzers are irrelevant.
    pub(crate) fn check_analysis<'a, I>(
        &self,
        fields: I,
        analysis: Option<&AnalysisOverride>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = &'a FieldContext>,
    {
        match analysis {
            Some(AnalysisOverride::Analyzer(name)) => {
                self.scope.analysis().resolve_analyzer(name)?;
            }
            Some(AnalysisOverride::SkipAnalysis) => {}
            None => {
                for field in fields {
                    if field.codec()?.is_text_like() {
                        field.search_analyzer()?;
                        field.normalizer()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Validates a skip-analysis request against target codecs.
    pub(crate) fn check_skip_analysis<'a, I>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a FieldContext>,
    {
        for field in fields {
            match field.codec()? {
                FieldCodec::Text => {}
                FieldCodec::Keyword => {
                    return Err(Error::SkipAnalysisOnKeywordField {
                        path: field.path().to_string(),
                    });
                }
                other => return Err(Error::unsupported(field.path(), "Skipping analysis", other)),
            }
        }
        Ok(())
    }

    pub(crate) fn finish(&self, node: super::PredicateNode) -> SearchPredicate {
        SearchPredicate::new(node, self.scope.index_names())
    }
}

/// Extracts the string of a text predicate's value.
pub(crate) fn text_value(path: &str, value: FieldValue) -> Result<String> {
    match value {
        FieldValue::String(text) => Ok(text),
        FieldValue::Null => Err(Error::invalid_value(path, "must be non-null")),
        other => Err(Error::invalid_value(
            path,
            format!("expected a string value, got a {}", other.kind()),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
