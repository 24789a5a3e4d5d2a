use fathom_core::{BooleanOperator, Error, FieldValue, Result};

use super::factory::{PredicateFactory, PredicateFinalStep, text_value};
use super::{
    AnalysisOverride, FieldTarget, PredicateNode, PredicateOptions, SearchPredicate,
    SimpleQueryStringPredicate, validate_boost,
};
use crate::query_string::SimpleQueryFlags;

const KIND: &str = "Text predicates";

/// Field selection of a simple query string predicate.
#[derive(Debug, Clone)]
pub struct SimpleQueryStringFieldStep<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<FieldTarget>,
}

impl<'s> SimpleQueryStringFieldStep<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>) -> Self {
        Self {
            factory,
            targets: Vec::new(),
        }
    }

    /// Adds a target field.
    pub fn field(mut self, path: &str) -> Result<Self> {
        self.targets.push(self.factory.text_field(path, KIND)?);
        Ok(self)
    }

    /// Adds several target fields.
    pub fn fields(self, paths: &[&str]) -> Result<Self> {
        paths.iter().try_fold(self, |step, path| step.field(path))
    }

    /// Boosts matches in the last added field.
    pub fn boost(mut self, boost: f32) -> Self {
        if let Some(target) = self.targets.last_mut() {
            target.boost = Some(boost);
        }
        self
    }

    /// Sets the query string.
    pub fn matching(self, query: impl Into<FieldValue>) -> Result<SimpleQueryStringBuilder<'s>> {
        let Some(first) = self.targets.first() else {
            return Err(Error::invalid_argument(
                "a simple query string predicate needs at least one field",
            ));
        };
        let query = text_value(first.path(), query.into())?;
        Ok(SimpleQueryStringBuilder {
            default_operator: self.factory.config().default_operator,
            factory: self.factory,
            targets: self.targets,
            query,
            flags: SimpleQueryFlags::default(),
            analysis: None,
            options: PredicateOptions::default(),
        })
    }
}

/// Options of a simple query string predicate.
#[derive(Debug, Clone)]
pub struct SimpleQueryStringBuilder<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<FieldTarget>,
    query: String,
    default_operator: BooleanOperator,
    flags: SimpleQueryFlags,
    analysis: Option<AnalysisOverride>,
    options: PredicateOptions,
}

impl SimpleQueryStringBuilder<'_> {
    /// Operator joining terms not separated by `+` or `|`.
    pub fn default_operator(mut self, operator: BooleanOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Enabled operators; the syntax of the others is ignored.
    pub fn flags(mut self, flags: SimpleQueryFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Analyzes terms with `analyzer` instead of the fields' analyzers.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analysis = Some(AnalysisOverride::Analyzer(analyzer.into()));
        self
    }

    /// Matches each term exactly.
    pub fn skip_analysis(mut self) -> Result<Self> {
        self.factory
            .check_skip_analysis(self.targets.iter().map(|t| t.field.as_ref()))?;
        self.analysis = Some(AnalysisOverride::SkipAnalysis);
        Ok(self)
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

impl PredicateFinalStep for SimpleQueryStringBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        for t in &self.targets {
            validate_boost(t.boost)?;
        }
        self.factory.check_analysis(
            self.targets.iter().map(|t| t.field.as_ref()),
            self.analysis.as_ref(),
        )?;
        log::trace!(
            "Simple query string '{}' over {} fields, flags {:?}",
            self.query,
            self.targets.len(),
            self.flags.names()
        );
        Ok(self
            .factory
            .finish(PredicateNode::SimpleQueryString(SimpleQueryStringPredicate {
                targets: self.targets,
                query: self.query,
                default_operator: self.default_operator,
                flags: self.flags,
                analysis: self.analysis,
                options: self.options,
            })))
    }
}
