use fathom_core::{Error, FieldCodec, FieldValue, Result};

use super::factory::{PredicateFactory, PredicateFinalStep};
use super::{
    AnalysisOverride, FieldTarget, Fuzziness, MatchPredicate, MatchTarget, PredicateNode,
    PredicateOptions, SearchPredicate, validate_boost,
};

/// Field selection of a match predicate.
#[derive(Debug, Clone)]
pub struct MatchFieldStep<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<(FieldTarget, FieldCodec)>,
}

impl<'s> MatchFieldStep<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>, path: &str) -> Result<Self> {
        Self {
            factory,
            targets: Vec::new(),
        }
        .field(path)
    }

    /// Adds another target field.
    pub fn field(mut self, path: &str) -> Result<Self> {
        let (field, codec) = self.factory.searchable_field(path)?;
        if codec == FieldCodec::GeoPoint {
            return Err(Error::unsupported(path, "Match predicates", codec));
        }
        self.targets.push((FieldTarget::new(field), codec));
        Ok(self)
    }

    /// Boosts matches in the last added field.
    pub fn boost(mut self, boost: f32) -> Self {
        if let Some((target, _)) = self.targets.last_mut() {
            target.boost = Some(boost);
        }
        self
    }

    /// Sets the value to match, encoded by each field's codec.
    pub fn matching(self, value: impl Into<FieldValue>) -> Result<MatchPredicateBuilder<'s>> {
        let value = value.into();
        let targets = self
            .targets
            .into_iter()
            .map(|(target, codec)| {
                let encoded = codec
                    .encode(&value)
                    .map_err(|reason| Error::invalid_value(target.path(), reason))?;
                Ok(MatchTarget {
                    target,
                    value: encoded,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MatchPredicateBuilder {
            factory: self.factory,
            targets,
            fuzziness: None,
            analysis: None,
            options: PredicateOptions::default(),
        })
    }
}

/// Options of a match predicate.
#[derive(Debug, Clone)]
pub struct MatchPredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    targets: Vec<MatchTarget>,
    fuzziness: Option<Fuzziness>,
    analysis: Option<AnalysisOverride>,
    options: PredicateOptions,
}

impl MatchPredicateBuilder<'_> {
    /// Enables fuzzy matching with an edit distance of 2.
    pub fn fuzzy(self) -> Result<Self> {
        self.fuzzy_with(2, 0)
    }

    /// Enables fuzzy matching.
    ///
    /// Only fields holding character data support fuzziness, and the edit
    /// distance may not exceed the configured maximum.
    pub fn fuzzy_with(mut self, max_edit_distance: u8, exact_prefix_length: u32) -> Result<Self> {
        let limit = self.factory.config().max_edit_distance;
        if max_edit_distance > limit {
            return Err(Error::invalid_argument(format!(
                "max edit distance must be between 0 and {limit}, got {max_edit_distance}"
            )));
        }
        for t in &self.targets {
            let codec = t.target.field.codec()?;
            if !codec.is_text_like() {
                return Err(Error::unsupported(
                    t.target.path(),
                    "Fuzzy match predicates",
                    codec,
                ));
            }
        }
        self.fuzziness = Some(Fuzziness {
            max_edit_distance,
            exact_prefix_length,
        });
        Ok(self)
    }

    /// Analyzes the value with `analyzer` instead of the fields' analyzers.
    ///
    /// The name is resolved when the predicate is built.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analysis = Some(AnalysisOverride::Analyzer(analyzer.into()));
        self
    }

    /// Matches the value as a single exact term.
    pub fn skip_analysis(mut self) -> Result<Self> {
        self.factory
            .check_skip_analysis(self.targets.iter().map(|t| t.target.field.as_ref()))?;
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

impl PredicateFinalStep for MatchPredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        for t in &self.targets {
            validate_boost(t.target.boost)?;
        }
        self.factory.check_analysis(
            self.targets.iter().map(|t| t.target.field.as_ref()),
            self.analysis.as_ref(),
        )?;
        Ok(self.factory.finish(PredicateNode::Match(MatchPredicate {
            targets: self.targets,
            fuzziness: self.fuzziness,
            analysis: self.analysis,
            options: self.options,
        })))
    }
}

// ============================================================================
// Tests
// ============================================================================
