//! Predicate Builder Tree.
//!
//! Predicates are built through a [`PredicateFactory`] bound to an
//! [`IndexScope`]. Every DSL call that names a field resolves it immediately,
//! so unknown fields and unsupported field types fail at the call site.
//! Finishing a builder with [`PredicateFinalStep::to_predicate`] yields an
//! immutable [`SearchPredicate`] that can be nested in a boolean predicate or
//! handed to a query.
//!
//! Compilation is a structural recursion over [`PredicateNode`]: each kind is
//! dispatched to the matching method of a [`BackendAdapter`], children first.

mod boolean;
mod factory;
mod match_all;
mod matching;
mod nested;
mod phrase;
mod range;
mod simple_query_string;

pub use boolean::BoolPredicateBuilder;
pub use factory::{PredicateFactory, PredicateFinalStep};
pub use match_all::MatchAllPredicateBuilder;
pub use matching::{MatchFieldStep, MatchPredicateBuilder};
pub use nested::NestedPredicateBuilder;
pub use phrase::{PhraseFieldStep, PhrasePredicateBuilder};
pub use range::{RangeFieldStep, RangePredicateBuilder};
pub use simple_query_string::{SimpleQueryStringBuilder, SimpleQueryStringFieldStep};

use std::sync::Arc;

use fathom_core::{
    BooleanOperator, Error, FieldContext, FieldValue, IndexScope, KEYWORD_ANALYZER, Result,
};

use crate::backend::BackendAdapter;
use crate::query_string::{self, QueryStringNode, SimpleQueryFlags};

/// A finished, immutable predicate.
///
/// Cloning is cheap: the tree is shared.
#[derive(Debug, Clone)]
pub struct SearchPredicate {
    node: Arc<PredicateNode>,
    index_names: Arc<[String]>,
}

impl SearchPredicate {
    pub(crate) fn new(node: PredicateNode, index_names: &[String]) -> Self {
        Self {
            node: Arc::new(node),
            index_names: index_names.into(),
        }
    }

    /// The root node.
    pub fn node(&self) -> &PredicateNode {
        &self.node
    }

    /// Indexes of the scope this predicate was built for.
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// Every field path referenced in the tree, in tree order.
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.node.collect_field_paths(&mut paths);
        paths
    }

    /// Compiles the tree into the backend's native representation.
    ///
    /// Identical trees compiled against the same scope yield identical
    /// native output.
    pub fn compile<B>(&self, scope: &IndexScope, backend: &B) -> Result<B::Predicate>
    where
        B: BackendAdapter + ?Sized,
    {
        match self.node() {
            PredicateNode::MatchAll(p) => backend.match_all(scope, p),
            PredicateNode::Match(p) => backend.match_field(scope, p),
            PredicateNode::Range(p) => backend.range(scope, p),
            PredicateNode::Phrase(p) => backend.phrase(scope, p),
            PredicateNode::SimpleQueryString(p) => backend.simple_query_string(scope, p),
            PredicateNode::Bool(p) => {
                let compile_all = |clauses: &[SearchPredicate]| {
                    clauses
                        .iter()
                        .map(|c| c.compile(scope, backend))
                        .collect::<Result<Vec<_>>>()
                };
                let clauses = BoolClauses {
                    must: compile_all(&p.must)?,
                    should: compile_all(&p.should)?,
                    must_not: compile_all(&p.must_not)?,
                    filter: compile_all(&p.filter)?,
                };
                backend.bool(scope, p, clauses)
            }
            PredicateNode::Nested(p) => {
                let inner = p.inner.compile(scope, backend)?;
                backend.nested(scope, p, inner)
            }
        }
    }
}

/// Predicate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Every document.
    MatchAll,
    /// Value match.
    Match,
    /// Value range.
    Range,
    /// Phrase match.
    Phrase,
    /// Simple query string.
    SimpleQueryString,
    /// Boolean combination.
    Bool,
    /// Nested documents.
    Nested,
}

/// A predicate node, tagged by kind.
#[derive(Debug, Clone)]
pub enum PredicateNode {
    /// See [`MatchAllPredicate`].
    MatchAll(MatchAllPredicate),
    /// See [`MatchPredicate`].
    Match(MatchPredicate),
    /// See [`RangePredicate`].
    Range(RangePredicate),
    /// See [`PhrasePredicate`].
    Phrase(PhrasePredicate),
    /// See [`SimpleQueryStringPredicate`].
    SimpleQueryString(SimpleQueryStringPredicate),
    /// See [`BoolPredicate`].
    Bool(BoolPredicate),
    /// See [`NestedPredicate`].
    Nested(NestedPredicate),
}

impl PredicateNode {
    /// The kind of this node.
    pub fn kind(&self) -> PredicateKind {
        match self {
            PredicateNode::MatchAll(_) => PredicateKind::MatchAll,
            PredicateNode::Match(_) => PredicateKind::Match,
            PredicateNode::Range(_) => PredicateKind::Range,
            PredicateNode::Phrase(_) => PredicateKind::Phrase,
            PredicateNode::SimpleQueryString(_) => PredicateKind::SimpleQueryString,
            PredicateNode::Bool(_) => PredicateKind::Bool,
            PredicateNode::Nested(_) => PredicateKind::Nested,
        }
    }

    fn collect_field_paths(&self, paths: &mut Vec<String>) {
        match self {
            PredicateNode::MatchAll(_) => {}
            PredicateNode::Match(p) => {
                paths.extend(p.targets.iter().map(|t| t.target.path().to_string()))
            }
            PredicateNode::Range(p) => paths.push(p.field.path().to_string()),
            PredicateNode::Phrase(p) => paths.extend(p.targets.iter().map(|t| t.path().to_string())),
            PredicateNode::SimpleQueryString(p) => {
                paths.extend(p.targets.iter().map(|t| t.path().to_string()))
            }
            PredicateNode::Bool(p) => {
                for clause in p.must.iter().chain(&p.should).chain(&p.must_not).chain(&p.filter) {
                    clause.node.collect_field_paths(paths);
                }
            }
            PredicateNode::Nested(p) => p.inner.node.collect_field_paths(paths),
        }
    }
}

/// Options shared by every predicate kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PredicateOptions {
    /// Multiplier applied to the predicate's score.
    pub boost: Option<f32>,
    /// Whether the score is replaced by a constant (the boost, or 1).
    pub constant_score: bool,
}

impl PredicateOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_boost(self.boost)
    }

    /// The score of a constant-score predicate.
    pub fn constant_score_value(&self) -> f32 {
        self.boost.unwrap_or(1.0)
    }
}

pub(crate) fn validate_boost(boost: Option<f32>) -> Result<()> {
    match boost {
        Some(b) if !b.is_finite() || b < 0.0 => Err(Error::invalid_argument(format!(
            "boost must be a finite, non-negative number, got {b}"
        ))),
        _ => Ok(()),
    }
}

/// A resolved target field with its optional field-level boost.
#[derive(Debug, Clone)]
pub struct FieldTarget {
    /// Resolved field.
    pub field: Arc<FieldContext>,
    /// Multiplier applied to matches in this field.
    pub boost: Option<f32>,
}

impl FieldTarget {
    pub(crate) fn new(field: Arc<FieldContext>) -> Self {
        Self { field, boost: None }
    }

    /// Absolute field path.
    pub fn path(&self) -> &str {
        self.field.path()
    }
}

/// Per-predicate replacement of the analysis applied to query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOverride {
    /// Analyze with this analyzer.
    Analyzer(String),
    /// Do not analyze: match the text as a single exact term.
    SkipAnalysis,
}

impl AnalysisOverride {
    /// Name of the analyzer to apply.
    pub fn analyzer_name(&self) -> &str {
        match self {
            AnalysisOverride::Analyzer(name) => name,
            AnalysisOverride::SkipAnalysis => KEYWORD_ANALYZER,
        }
    }
}

/// The analyzer applied to query text for `field`: the override if any, else
/// the field's search analyzer, else its write analyzer.
pub fn effective_analyzer<'a>(
    field: &'a FieldContext,
    analysis: Option<&'a AnalysisOverride>,
) -> Result<Option<&'a str>> {
    match analysis {
        Some(o) => Ok(Some(o.analyzer_name())),
        None => field.search_analyzer(),
    }
}

/// Matches every document.
#[derive(Debug, Clone)]
pub struct MatchAllPredicate {
    /// Common options.
    pub options: PredicateOptions,
}

/// Fuzzy matching settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fuzziness {
    /// Maximum edit distance, 0 to 2.
    pub max_edit_distance: u8,
    /// Number of leading characters that must match exactly.
    pub exact_prefix_length: u32,
}

/// One field of a match predicate, with the value encoded for that field.
#[derive(Debug, Clone)]
pub struct MatchTarget {
    /// Target field.
    pub target: FieldTarget,
    /// Value encoded by the field's codec.
    pub value: FieldValue,
}

/// Matches documents whose field holds a value.
#[derive(Debug, Clone)]
pub struct MatchPredicate {
    /// Target fields; a document matches if any field matches.
    pub targets: Vec<MatchTarget>,
    /// Fuzzy settings for text fields.
    pub fuzziness: Option<Fuzziness>,
    /// Analysis override for text fields.
    pub analysis: Option<AnalysisOverride>,
    /// Common options.
    pub options: PredicateOptions,
}

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    /// Bound value, encoded by the field's codec once the range is built.
    pub value: FieldValue,
    /// Whether the bound itself matches.
    pub inclusive: bool,
}

impl RangeBound {
    /// A bound that matches its own value.
    pub fn included(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    /// A bound that excludes its own value.
    pub fn excluded(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Matches documents whose field value falls in a range.
#[derive(Debug, Clone)]
pub struct RangePredicate {
    /// Target field.
    pub field: Arc<FieldContext>,
    /// Lower bound, unbounded if `None`.
    pub lower: Option<RangeBound>,
    /// Upper bound, unbounded if `None`.
    pub upper: Option<RangeBound>,
    /// Common options.
    pub options: PredicateOptions,
}

/// Matches documents containing analyzed terms in sequence.
#[derive(Debug, Clone)]
pub struct PhrasePredicate {
    /// Target fields.
    pub targets: Vec<FieldTarget>,
    /// Phrase text.
    pub text: String,
    /// Allowed position moves.
    pub slop: u32,
    /// Analysis override.
    pub analysis: Option<AnalysisOverride>,
    /// Common options.
    pub options: PredicateOptions,
}

/// A simple query string over one or more text fields.
#[derive(Debug, Clone)]
pub struct SimpleQueryStringPredicate {
    /// Target fields.
    pub targets: Vec<FieldTarget>,
    /// Query as supplied.
    pub query: String,
    /// Operator joining bare terms.
    pub default_operator: BooleanOperator,
    /// Enabled operators.
    pub flags: SimpleQueryFlags,
    /// Analysis override.
    pub analysis: Option<AnalysisOverride>,
    /// Common options.
    pub options: PredicateOptions,
}

impl SimpleQueryStringPredicate {
    /// The query with the syntax of disabled operators removed.
    pub fn effective_query(&self) -> String {
        query_string::strip_disabled_syntax(&self.query, self.flags)
    }

    /// The parsed query, `None` if it holds no term.
    pub fn parse(&self) -> Option<QueryStringNode> {
        query_string::parse_with_flags(&self.query, self.flags, self.default_operator)
    }
}

/// Clause lists of a boolean predicate.
///
/// Used both for built predicates and, with native fragments, for compiled
/// ones.
#[derive(Debug, Clone)]
pub struct BoolClauses<T> {
    /// Clauses that must match and contribute to the score.
    pub must: Vec<T>,
    /// Clauses that contribute to the score; at least one must match when
    /// there is no `must` or `filter` clause.
    pub should: Vec<T>,
    /// Clauses that must not match.
    pub must_not: Vec<T>,
    /// Clauses that must match without contributing to the score.
    pub filter: Vec<T>,
}

impl<T> Default for BoolClauses<T> {
    fn default() -> Self {
        Self {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: Vec::new(),
        }
    }
}

impl<T> BoolClauses<T> {
    /// Whether every list is empty.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    /// Whether only `must_not` clauses are present.
    pub fn is_negative_only(&self) -> bool {
        !self.must_not.is_empty()
            && self.must.is_empty()
            && self.should.is_empty()
            && self.filter.is_empty()
    }
}

/// A boolean combination of predicates; without any clause it matches every
/// document.
#[derive(Debug, Clone)]
pub struct BoolPredicate {
    /// `must` clauses.
    pub must: Vec<SearchPredicate>,
    /// `should` clauses.
    pub should: Vec<SearchPredicate>,
    /// `must_not` clauses.
    pub must_not: Vec<SearchPredicate>,
    /// `filter` clauses.
    pub filter: Vec<SearchPredicate>,
    /// Common options.
    pub options: PredicateOptions,
}

/// Matches documents with at least one nested object matching `inner`.
#[derive(Debug, Clone)]
pub struct NestedPredicate {
    /// Path of the nested object field.
    pub object_path: String,
    /// Predicate on the nested object's fields.
    pub inner: SearchPredicate,
}
