use fathom_core::{Error, FieldCodec, FieldValue, Result};

use super::factory::{PredicateFactory, PredicateFinalStep, text_value};
use super::{
    AnalysisOverride, FieldTarget, PhrasePredicate, PredicateNode, PredicateOptions,
    SearchPredicate, validate_boost,
};

const KIND: &str = "Phrase predicates";

/// Field selection of a phrase predicate.
#[derive(Debug, Clone)]
pub struct PhraseFieldStep<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<FieldTarget>,
}

impl<'s> PhraseFieldStep<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>, path: &str) -> Result<Self> {
        Self {
            factory,
            targets: Vec::new(),
        }
        .field(path)
    }

    /// Adds another target field.
    pub fn field(mut self, path: &str) -> Result<Self> {
        let target = self.factory.text_field(path, KIND)?;
        let codec = target.field.codec()?;
        if codec != FieldCodec::Text {
            return Err(Error::unsupported(path, KIND, codec));
        }
        self.targets.push(target);
        Ok(self)
    }

    /// Boosts matches in the last added field.
    pub fn boost(mut self, boost: f32) -> Self {
        if let Some(target) = self.targets.last_mut() {
            target.boost = Some(boost);
        }
        self
    }

    /// Sets the phrase.
    pub fn matching(self, phrase: impl Into<FieldValue>) -> Result<PhrasePredicateBuilder<'s>> {
        let path = self.targets.first().map(FieldTarget::path).unwrap_or_default();
        let text = text_value(path, phrase.into())?;
        Ok(PhrasePredicateBuilder {
            factory: self.factory,
            targets: self.targets,
            text,
            slop: 0,
            analysis: None,
            options: PredicateOptions::default(),
        })
    }
}

/// Options of a phrase predicate.
#[derive(Debug, Clone)]
pub struct PhrasePredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<FieldTarget>,
    text: String,
    slop: u32,
    analysis: Option<AnalysisOverride>,
    options: PredicateOptions,
}

impl PhrasePredicateBuilder<'_> {
    /// Number of position moves allowed between terms.
    pub fn slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    /// Analyzes the phrase with `analyzer` instead of the fields' analyzers.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analysis = Some(AnalysisOverride::Analyzer(analyzer.into()));
        self
    }

    /// Matches the phrase as a single exact term.
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

impl PredicateFinalStep for PhrasePredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        for t in &self.targets {
            validate_boost(t.boost)?;
        }
        self.factory.check_analysis(
            self.targets.iter().map(|t| t.field.as_ref()),
            self.analysis.as_ref(),
        )?;
        Ok(self.factory.finish(PredicateNode::Phrase(PhrasePredicate {
            targets: self.targets,
            text: self.text,
            slop: self.slop,
            analysis: self.analysis,
            options: self.options,
        })))
    }
}
