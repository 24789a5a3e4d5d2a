use std::sync::Arc;

use fathom_core::{Error, FieldCodec, FieldContext, FieldValue, Result};

use super::factory::{PredicateFactory, PredicateFinalStep};
use super::{PredicateNode, PredicateOptions, RangeBound, RangePredicate, SearchPredicate};

/// Field selection of a range predicate.
#[derive(Debug, Clone)]
pub struct RangeFieldStep<'s> {
    factory: PredicateFactory<'s>,
    field: Arc<FieldContext>,
    codec: FieldCodec,
}

impl<'s> RangeFieldStep<'s> {
    pub(crate) fn new(factory: PredicateFactory<'s>, path: &str) -> Result<Self> {
        let (field, codec) = factory.searchable_field(path)?;
        match codec {
            FieldCodec::Text | FieldCodec::Boolean | FieldCodec::GeoPoint => {
                Err(Error::unsupported(path, "Range predicates", codec))
            }
            _ => Ok(Self {
                factory,
                field,
                codec,
            }),
        }
    }

    /// Values between `lower` and `upper`, both included.
    pub fn between(
        self,
        lower: impl Into<FieldValue>,
        upper: impl Into<FieldValue>,
    ) -> Result<RangePredicateBuilder<'s>> {
        self.within(
            Some(RangeBound::included(lower)),
            Some(RangeBound::included(upper)),
        )
    }

    /// Values greater than or equal to `value`.
    pub fn at_least(self, value: impl Into<FieldValue>) -> Result<RangePredicateBuilder<'s>> {
        self.within(Some(RangeBound::included(value)), None)
    }

    /// Values strictly greater than `value`.
    pub fn greater_than(self, value: impl Into<FieldValue>) -> Result<RangePredicateBuilder<'s>> {
        self.within(Some(RangeBound::excluded(value)), None)
    }

    /// Values less than or equal to `value`.
    pub fn at_most(self, value: impl Into<FieldValue>) -> Result<RangePredicateBuilder<'s>> {
        self.within(None, Some(RangeBound::included(value)))
    }

    /// Values strictly less than `value`.
    pub fn less_than(self, value: impl Into<FieldValue>) -> Result<RangePredicateBuilder<'s>> {
        self.within(None, Some(RangeBound::excluded(value)))
    }

    /// Values within explicit bounds; `None` leaves a side unbounded.
    pub fn within(
        self,
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
    ) -> Result<RangePredicateBuilder<'s>> {
        if lower.is_none() && upper.is_none() {
            return Err(Error::invalid_argument(format!(
                "range on field '{}' needs at least one bound",
                self.field.path()
            )));
        }
        let lower = lower.map(|b| self.encode(b)).transpose()?;
        let upper = upper.map(|b| self.encode(b)).transpose()?;
        Ok(RangePredicateBuilder {
            factory: self.factory,
            field: self.field,
            lower,
            upper,
            options: PredicateOptions::default(),
        })
    }

    fn encode(&self, bound: RangeBound) -> Result<RangeBound> {
        let value = self
            .codec
            .encode(&bound.value)
            .map_err(|reason| Error::invalid_value(self.field.path(), reason))?;
        Ok(RangeBound {
            value,
            inclusive: bound.inclusive,
        })
    }
}

/// Options of a range predicate.
#[derive(Debug, Clone)]
pub struct RangePredicateBuilder<'s> {
    factory: PredicateFactory<'s>,
    field: Arc<FieldContext>,
    lower: Option<RangeBound>,
    upper: Option<RangeBound>,
    options: PredicateOptions,
}

impl RangePredicateBuilder<'_> {
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

impl PredicateFinalStep for RangePredicateBuilder<'_> {
    fn to_predicate(self) -> Result<SearchPredicate> {
        self.options.validate()?;
        self.factory
            .check_analysis([self.field.as_ref()], None)?;
        Ok(self.factory.finish(PredicateNode::Range(RangePredicate {
            field: self.field,
            lower: self.lower,
            upper: self.upper,
            options: self.options,
        })))
    }
}
