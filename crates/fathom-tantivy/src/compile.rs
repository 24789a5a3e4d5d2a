//! Predicate compilation into Tantivy queries.
//!
//! Each logical field maps to one physical field per declaring index (see
//! [`PhysicalSchema`]), so every leaf query is a disjunction over the
//! physical fields of its target. Query text goes through the same
//! [`Analyzers`] pipelines that indexed the documents.

use std::fmt;
use std::ops::Bound;

use fathom_core::{BooleanOperator, Error, FieldCodec, FieldContext, FieldValue, Result};
use fathom_query::predicate::{
    BoolPredicate, MatchPredicate, MatchTarget, PhrasePredicate, RangeBound, RangePredicate,
    SimpleQueryStringPredicate,
};
use fathom_query::{
    AnalysisOverride, BoolClauses, Fuzziness, PredicateOptions, QueryStringNode,
    effective_analyzer,
};
use tantivy::Term;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, FuzzyTermQuery, Occur,
    PhraseQuery, Query, QueryClone, RangeQuery, RegexQuery, TermQuery, TermSetQuery,
};
use tantivy::schema::{Field, IndexRecordOption};

use crate::analysis::{AnalyzedToken, Analyzers};
use crate::backend::tantivy_error;
use crate::nested::NestedQuery;
use crate::schema::{PhysicalField, PhysicalSchema};

/// A compiled Tantivy query.
pub struct TantivyQuery(Box<dyn Query>);

impl TantivyQuery {
    /// Wraps a boxed query.
    pub fn new(query: Box<dyn Query>) -> Self {
        Self(query)
    }

    /// The wrapped query.
    pub fn as_query(&self) -> &dyn Query {
        self.0.as_ref()
    }

    /// Unwraps the boxed query.
    pub fn into_inner(self) -> Box<dyn Query> {
        self.0
    }
}

impl Clone for TantivyQuery {
    fn clone(&self) -> Self {
        Self(self.0.box_clone())
    }
}

impl fmt::Debug for TantivyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Compiles predicate nodes against one physical schema.
pub(crate) struct Compiler<'a> {
    pub schema: &'a PhysicalSchema,
    pub analyzers: &'a Analyzers,
}

impl Compiler<'_> {
    pub fn match_all(&self, options: &PredicateOptions) -> Box<dyn Query> {
        with_options(Box::new(AllQuery), options)
    }

    pub fn match_field(&self, predicate: &MatchPredicate) -> Result<Box<dyn Query>> {
        let mut per_target = Vec::with_capacity(predicate.targets.len());
        for target in &predicate.targets {
            let query =
                self.match_target(target, predicate.fuzziness, predicate.analysis.as_ref())?;
            per_target.push(boosted(query, target.target.boost));
        }
        Ok(with_options(any_of(per_target), &predicate.options))
    }

    fn match_target(
        &self,
        target: &MatchTarget,
        fuzziness: Option<Fuzziness>,
        analysis: Option<&AnalysisOverride>,
    ) -> Result<Box<dyn Query>> {
        let field = target.target.field.as_ref();
        let codec = field.codec()?;
        let physical = self.schema.fields_of(field);

        let mut queries = Vec::with_capacity(physical.len());
        match codec {
            FieldCodec::Text | FieldCodec::Keyword => {
                let text = target.value.as_str().ok_or_else(|| {
                    Error::invalid_value(field.path(), format!("expected text, got {}", target.value))
                })?;
                let terms = self.query_terms(field, codec, text, analysis)?;
                for pf in &physical {
                    let clauses = terms
                        .iter()
                        .map(|term| term_query(pf, term, fuzziness))
                        .collect::<Result<Vec<_>>>()?;
                    queries.push(any_of(clauses));
                }
            }
            FieldCodec::GeoPoint => {
                return Err(Error::unsupported(field.path(), "Match predicates", codec));
            }
            _ => {
                for pf in &physical {
                    let term = numeric_term(pf.field, codec, &target.value, field.path())?;
                    queries.push(Box::new(TermQuery::new(term, IndexRecordOption::Basic)));
                }
            }
        }
        Ok(any_of(queries))
    }

    pub fn range(&self, predicate: &RangePredicate) -> Result<Box<dyn Query>> {
        let field = predicate.field.as_ref();
        let codec = field.codec()?;
        let normalizer = match codec {
            FieldCodec::Keyword => field.normalizer()?,
            FieldCodec::Text | FieldCodec::Boolean | FieldCodec::GeoPoint => {
                return Err(Error::unsupported(field.path(), "Range predicates", codec));
            }
            _ => None,
        };

        let queries = self
            .schema
            .fields_of(field)
            .into_iter()
            .map(|pf| {
                let lower = self.bound(pf.field, codec, normalizer, field.path(), predicate.lower.as_ref())?;
                let upper = self.bound(pf.field, codec, normalizer, field.path(), predicate.upper.as_ref())?;
                Ok(Box::new(RangeQuery::new(lower, upper)) as Box<dyn Query>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(with_options(any_of(queries), &predicate.options))
    }

    fn bound(
        &self,
        field: Field,
        codec: FieldCodec,
        normalizer: Option<&str>,
        path: &str,
        bound: Option<&RangeBound>,
    ) -> Result<Bound<Term>> {
        let Some(bound) = bound else {
            return Ok(Bound::Unbounded);
        };
        let term = match (codec, &bound.value) {
            (FieldCodec::Keyword, FieldValue::String(text)) => Term::from_field_text(
                field,
                &self.analyzers.normalize_keyword(normalizer, text)?,
            ),
            _ => numeric_term(field, codec, &bound.value, path)?,
        };
        Ok(if bound.inclusive {
            Bound::Included(term)
        } else {
            Bound::Excluded(term)
        })
    }

    pub fn phrase(&self, predicate: &PhrasePredicate) -> Result<Box<dyn Query>> {
        let mut per_target = Vec::with_capacity(predicate.targets.len());
        for target in &predicate.targets {
            let field = target.field.as_ref();
            let analyzer = effective_analyzer(field, predicate.analysis.as_ref())?;
            let tokens = self.analyzers.tokens(analyzer, &predicate.text)?;
            let queries = self
                .schema
                .fields_of(field)
                .iter()
                .map(|pf| phrase_query(pf.field, &tokens, predicate.slop))
                .collect();
            per_target.push(boosted(any_of(queries), target.boost));
        }
        Ok(with_options(any_of(per_target), &predicate.options))
    }

    pub fn simple_query_string(
        &self,
        predicate: &SimpleQueryStringPredicate,
    ) -> Result<Box<dyn Query>> {
        let root = match predicate.parse() {
            Some(node) => self.sqs_node(predicate, &node)?,
            None => None,
        };
        // Nothing left after analysis matches nothing.
        let query = root.unwrap_or_else(|| Box::new(EmptyQuery));
        Ok(with_options(query, &predicate.options))
    }

    fn sqs_node(
        &self,
        p: &SimpleQueryStringPredicate,
        node: &QueryStringNode,
    ) -> Result<Option<Box<dyn Query>>> {
        match node {
            QueryStringNode::And(children) => {
                Ok(combine(self.sqs_children(p, children)?, Occur::Must))
            }
            QueryStringNode::Or(children) => {
                Ok(combine(self.sqs_children(p, children)?, Occur::Should))
            }
            QueryStringNode::Not(inner) => Ok(self.sqs_node(p, inner)?.map(|q| {
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, q),
                ])) as Box<dyn Query>
            })),
            QueryStringNode::Term(text) => self.sqs_leaf(p, |field, codec, physical| {
                let terms = self.query_terms(field, codec, text, p.analysis.as_ref())?;
                let occur = match p.default_operator {
                    BooleanOperator::And => Occur::Must,
                    BooleanOperator::Or => Occur::Should,
                };
                let queries = physical
                    .iter()
                    .filter_map(|pf| {
                        let clauses = terms.iter().map(|t| text_term_query(pf, t)).collect();
                        combine(clauses, occur)
                    })
                    .collect();
                Ok(combine(queries, Occur::Should))
            }),
            QueryStringNode::Prefix(prefix) => self.sqs_leaf(p, |field, codec, physical| {
                let prefix = self.normalize(field, codec, p.analysis.as_ref(), prefix)?;
                if prefix.is_empty() {
                    return Ok(None);
                }
                let queries = physical
                    .iter()
                    .map(|pf| prefix_query(pf.field, &prefix))
                    .collect::<Result<Vec<_>>>()?;
                Ok(combine(queries, Occur::Should))
            }),
            QueryStringNode::Fuzzy {
                term,
                max_edit_distance,
            } => self.sqs_leaf(p, |field, codec, physical| {
                let term = self.normalize(field, codec, p.analysis.as_ref(), term)?;
                if term.is_empty() {
                    return Ok(None);
                }
                let queries = physical
                    .iter()
                    .map(|pf| {
                        Box::new(FuzzyTermQuery::new(
                            Term::from_field_text(pf.field, &term),
                            *max_edit_distance,
                            true,
                        )) as Box<dyn Query>
                    })
                    .collect();
                Ok(combine(queries, Occur::Should))
            }),
            QueryStringNode::Phrase { text, slop } => self.sqs_leaf(p, |field, codec, physical| {
                let tokens = match codec {
                    FieldCodec::Text => {
                        let analyzer = effective_analyzer(field, p.analysis.as_ref())?;
                        self.analyzers.tokens(analyzer, text)?
                    }
                    _ => vec![AnalyzedToken {
                        position: 0,
                        text: self.normalize(field, codec, p.analysis.as_ref(), text)?,
                    }],
                };
                if tokens.is_empty() {
                    return Ok(None);
                }
                let queries = physical
                    .iter()
                    .map(|pf| phrase_query(pf.field, &tokens, *slop))
                    .collect();
                Ok(combine(queries, Occur::Should))
            }),
        }
    }

    fn sqs_children(
        &self,
        p: &SimpleQueryStringPredicate,
        children: &[QueryStringNode],
    ) -> Result<Vec<Box<dyn Query>>> {
        let mut compiled = Vec::with_capacity(children.len());
        for child in children {
            if let Some(query) = self.sqs_node(p, child)? {
                compiled.push(query);
            }
        }
        Ok(compiled)
    }

    /// Compiles one query string leaf for every target field.
    fn sqs_leaf<F>(&self, p: &SimpleQueryStringPredicate, build: F) -> Result<Option<Box<dyn Query>>>
    where
        F: Fn(&FieldContext, FieldCodec, &[PhysicalField]) -> Result<Option<Box<dyn Query>>>,
    {
        let mut per_target = Vec::with_capacity(p.targets.len());
        for target in &p.targets {
            let field = target.field.as_ref();
            let codec = field.codec()?;
            if !codec.is_text_like() {
                return Err(Error::unsupported(
                    field.path(),
                    "Simple query string predicates",
                    codec,
                ));
            }
            if let Some(query) = build(field, codec, &self.schema.fields_of(field))? {
                per_target.push(boosted(query, target.boost));
            }
        }
        Ok(combine(per_target, Occur::Should))
    }

    pub fn bool(
        &self,
        predicate: &BoolPredicate,
        clauses: BoolClauses<TantivyQuery>,
    ) -> Box<dyn Query> {
        if clauses.is_empty() {
            return with_options(Box::new(AllQuery), &predicate.options);
        }
        let negative_only = clauses.is_negative_only();

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        subqueries.extend(clauses.must.into_iter().map(|q| (Occur::Must, q.into_inner())));
        subqueries.extend(clauses.should.into_iter().map(|q| (Occur::Should, q.into_inner())));
        subqueries.extend(
            clauses
                .must_not
                .into_iter()
                .map(|q| (Occur::MustNot, q.into_inner())),
        );
        subqueries.extend(clauses.filter.into_iter().map(|q| {
            (
                Occur::Must,
                Box::new(ConstScoreQuery::new(q.into_inner(), 0.0)) as Box<dyn Query>,
            )
        }));
        if negative_only {
            subqueries.push((Occur::Must, Box::new(AllQuery)));
        }
        with_options(Box::new(BooleanQuery::new(subqueries)), &predicate.options)
    }

    /// Matches documents holding an object at `object_path` that matches
    /// `inner` on its own.
    pub fn nested(&self, object_path: &str, inner: Box<dyn Query>) -> Box<dyn Query> {
        Box::new(NestedQuery::new(object_path, inner, self.schema.join_fields()))
    }

    /// Restricts `query` to the documents of `index_names`, and of the tenant
    /// if any. The restriction does not contribute to scores.
    pub fn scoped(
        &self,
        query: Box<dyn Query>,
        index_names: &[String],
        tenant_id: Option<&str>,
    ) -> Box<dyn Query> {
        let index_field = self.schema.index_field();
        let indexes = TermSetQuery::new(
            index_names
                .iter()
                .map(|name| Term::from_field_text(index_field, name)),
        );
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Must, query),
            (
                Occur::Must,
                Box::new(ConstScoreQuery::new(Box::new(indexes), 0.0)),
            ),
        ];
        if let Some(tenant_id) = tenant_id {
            let tenant = TermQuery::new(
                Term::from_field_text(self.schema.tenant_field(), tenant_id),
                IndexRecordOption::Basic,
            );
            clauses.push((
                Occur::Must,
                Box::new(ConstScoreQuery::new(Box::new(tenant), 0.0)),
            ));
        }
        Box::new(BooleanQuery::new(clauses))
    }

    /// The terms query text turns into for a text-like field.
    fn query_terms(
        &self,
        field: &FieldContext,
        codec: FieldCodec,
        text: &str,
        analysis: Option<&AnalysisOverride>,
    ) -> Result<Vec<String>> {
        match (codec, analysis) {
            (FieldCodec::Keyword, Some(AnalysisOverride::Analyzer(name))) => Ok(self
                .analyzers
                .tokens(Some(name), text)?
                .into_iter()
                .map(|t| t.text)
                .collect()),
            (FieldCodec::Keyword, _) => {
                Ok(vec![self.analyzers.normalize_keyword(field.normalizer()?, text)?])
            }
            _ => {
                let analyzer = effective_analyzer(field, analysis)?;
                Ok(self
                    .analyzers
                    .tokens(analyzer, text)?
                    .into_iter()
                    .map(|t| t.text)
                    .collect())
            }
        }
    }

    /// Normalizes a prefix or fuzzy term without splitting it.
    fn normalize(
        &self,
        field: &FieldContext,
        codec: FieldCodec,
        analysis: Option<&AnalysisOverride>,
        text: &str,
    ) -> Result<String> {
        match (codec, analysis) {
            (FieldCodec::Keyword, Some(AnalysisOverride::Analyzer(name))) => {
                self.analyzers.normalize_with_analyzer(Some(name), text)
            }
            (FieldCodec::Keyword, _) => self.analyzers.normalize_keyword(field.normalizer()?, text),
            _ => self
                .analyzers
                .normalize_with_analyzer(effective_analyzer(field, analysis)?, text),
        }
    }
}

/// Applies a predicate's boost and constant-score options.
fn with_options(query: Box<dyn Query>, options: &PredicateOptions) -> Box<dyn Query> {
    if options.constant_score {
        Box::new(ConstScoreQuery::new(query, options.constant_score_value()))
    } else {
        boosted(query, options.boost)
    }
}

fn boosted(query: Box<dyn Query>, boost: Option<f32>) -> Box<dyn Query> {
    match boost {
        Some(boost) => Box::new(BoostQuery::new(query, boost)),
        None => query,
    }
}

/// Joins queries with `occur`; `None` when there are none.
fn combine(mut queries: Vec<Box<dyn Query>>, occur: Occur) -> Option<Box<dyn Query>> {
    match queries.len() {
        0 => None,
        1 => queries.pop(),
        _ => Some(Box::new(BooleanQuery::new(
            queries.into_iter().map(|q| (occur, q)).collect(),
        ))),
    }
}

/// Matches any of `queries`; no query matches nothing.
fn any_of(queries: Vec<Box<dyn Query>>) -> Box<dyn Query> {
    combine(queries, Occur::Should).unwrap_or_else(|| Box::new(EmptyQuery))
}

fn record_option(codec: FieldCodec) -> IndexRecordOption {
    match codec {
        FieldCodec::Text => IndexRecordOption::WithFreqs,
        _ => IndexRecordOption::Basic,
    }
}

fn text_term_query(pf: &PhysicalField, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(pf.field, text),
        record_option(pf.codec),
    ))
}

fn term_query(pf: &PhysicalField, text: &str, fuzziness: Option<Fuzziness>) -> Result<Box<dyn Query>> {
    let Some(fuzziness) = fuzziness else {
        return Ok(text_term_query(pf, text));
    };
    let fuzzy: Box<dyn Query> = Box::new(FuzzyTermQuery::new(
        Term::from_field_text(pf.field, text),
        fuzziness.max_edit_distance,
        true,
    ));
    if fuzziness.exact_prefix_length == 0 {
        return Ok(fuzzy);
    }
    let prefix: String = text
        .chars()
        .take(fuzziness.exact_prefix_length as usize)
        .collect();
    Ok(Box::new(BooleanQuery::new(vec![
        (Occur::Must, fuzzy),
        (Occur::Must, prefix_query(pf.field, &prefix)?),
    ])))
}

fn prefix_query(field: Field, prefix: &str) -> Result<Box<dyn Query>> {
    let pattern = format!("{}.*", regex::escape(prefix));
    let query = RegexQuery::from_pattern(&pattern, field)
        .map_err(|e| tantivy_error("invalid prefix pattern", e))?;
    Ok(Box::new(query))
}

fn phrase_query(field: Field, tokens: &[AnalyzedToken], slop: u32) -> Box<dyn Query> {
    match tokens {
        [] => Box::new(EmptyQuery),
        [single] => Box::new(TermQuery::new(
            Term::from_field_text(field, &single.text),
            IndexRecordOption::WithFreqs,
        )),
        [first, ..] => {
            let terms = tokens
                .iter()
                .map(|t| {
                    (
                        t.position - first.position,
                        Term::from_field_text(field, &t.text),
                    )
                })
                .collect();
            let mut query = PhraseQuery::new_with_offset(terms);
            query.set_slop(slop);
            Box::new(query)
        }
    }
}

fn numeric_term(field: Field, codec: FieldCodec, value: &FieldValue, path: &str) -> Result<Term> {
    let term = match codec {
        FieldCodec::Long => value.as_i64().map(|v| Term::from_field_i64(field, v)),
        FieldCodec::Double | FieldCodec::ScaledNumber { .. } => {
            value.as_f64().map(|v| Term::from_field_f64(field, v))
        }
        FieldCodec::Boolean => value.as_bool().map(|v| Term::from_field_bool(field, v)),
        _ => None,
    };
    term.ok_or_else(|| {
        Error::invalid_value(path, format!("cannot compare {value} with a {codec} field"))
    })
}

// ============================================================================
// Tests
// ============================================================================
