//! Hit collection on a searcher.

use fathom_core::{FieldCodec, FieldValue, GeoPoint, Result};
use fathom_query::{DocumentReference, HitRequirement, RawHit, RawSearchResult, RawValue};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::Query;
use tantivy::schema::Value;
use tantivy::{DocAddress, Score, Searcher, TantivyDocument};

use crate::backend::tantivy_error;
use crate::schema::{PhysicalField, PhysicalSchema};
use crate::sort::{SortKey, TantivySort, compare_keys};

/// Everything needed to run one search.
pub(crate) struct SearchPlan {
    pub query: Box<dyn Query>,
    pub sorts: Vec<TantivySort>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub requirements: Vec<HitRequirement>,
    pub track_scores: bool,
}

impl SearchPlan {
    /// Runs the plan and builds the requested page.
    pub fn run(&self, searcher: &Searcher, schema: &PhysicalSchema) -> Result<RawSearchResult> {
        // A zero limit only counts.
        if self.limit == Some(0) {
            let count = searcher
                .search(self.query.as_ref(), &Count)
                .map_err(|e| tantivy_error("search failed", e))?;
            return Ok(RawSearchResult {
                total_hit_count: count as u64,
                hits: Vec::new(),
            });
        }

        let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
        if self.sorts.is_empty() {
            let limit = self.limit.unwrap_or(num_docs).max(1);
            let collector = (Count, TopDocs::with_limit(limit).and_offset(self.offset));
            let (count, top_docs) = searcher
                .search(self.query.as_ref(), &collector)
                .map_err(|e| tantivy_error("search failed", e))?;
            let hits = top_docs
                .into_iter()
                .map(|(score, address)| {
                    let doc = load(searcher, address)?;
                    Ok(self.hit(schema, &doc, score))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(RawSearchResult {
                total_hit_count: count as u64,
                hits,
            });
        }

        let (count, all_docs) = searcher
            .search(self.query.as_ref(), &(Count, TopDocs::with_limit(num_docs)))
            .map_err(|e| tantivy_error("search failed", e))?;
        let mut keyed = all_docs
            .into_iter()
            .map(|(score, address)| {
                let doc = load(searcher, address)?;
                let keys = self.sort_keys(schema, &doc, score);
                Ok((keys, doc, score))
            })
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, ..), (b, ..)| compare_keys(&self.sorts, a, b));

        let page = keyed.into_iter().skip(self.offset);
        let hits = match self.limit {
            Some(limit) => page
                .take(limit)
                .map(|(_, doc, score)| self.hit(schema, &doc, score))
                .collect(),
            None => page.map(|(_, doc, score)| self.hit(schema, &doc, score)).collect(),
        };
        log::trace!("Sorted {count} hits by {} elements", self.sorts.len());
        Ok(RawSearchResult {
            total_hit_count: count as u64,
            hits,
        })
    }

    fn hit(&self, schema: &PhysicalSchema, doc: &TantivyDocument, score: Score) -> RawHit {
        let index = first_text(doc, schema.index_field()).unwrap_or_default();
        let id = first_text(doc, schema.id_field()).unwrap_or_default();
        let values = self
            .requirements
            .iter()
            .map(|requirement| match requirement {
                HitRequirement::FieldValues { path } => {
                    let values = schema
                        .field(&index, path)
                        .map(|pf| stored_values(doc, pf))
                        .unwrap_or_default();
                    if values.is_empty() {
                        RawValue::Missing
                    } else {
                        RawValue::Values(values)
                    }
                }
                HitRequirement::Distance { path, center } => {
                    let points = schema
                        .field(&index, path)
                        .map(|pf| stored_points(doc, pf))
                        .unwrap_or_default();
                    match SortKey::from_points(&points, center) {
                        SortKey::Distance(Some(meters)) => RawValue::Distance(meters),
                        _ => RawValue::Missing,
                    }
                }
            })
            .collect();
        RawHit {
            reference: DocumentReference::new(index, id),
            score: self.track_scores.then_some(score),
            values,
        }
    }

    fn sort_keys(&self, schema: &PhysicalSchema, doc: &TantivyDocument, score: Score) -> Vec<SortKey> {
        let index = first_text(doc, schema.index_field()).unwrap_or_default();
        self.sorts
            .iter()
            .map(|sort| match sort {
                TantivySort::Score { .. } => SortKey::Score(score),
                TantivySort::Field { order, .. } => {
                    let values = sort
                        .field_for(&index)
                        .map(|pf| stored_values(doc, pf))
                        .unwrap_or_default();
                    SortKey::from_values(&values, *order)
                }
                TantivySort::Distance { center, .. } => {
                    let points = sort
                        .field_for(&index)
                        .map(|pf| stored_points(doc, pf))
                        .unwrap_or_default();
                    SortKey::from_points(&points, center)
                }
            })
            .collect()
    }
}

fn load(searcher: &Searcher, address: DocAddress) -> Result<TantivyDocument> {
    searcher
        .doc(address)
        .map_err(|e| tantivy_error("failed to load document", e))
}

pub(crate) fn first_text(doc: &TantivyDocument, field: tantivy::schema::Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Decodes the stored values of a field.
fn stored_values(doc: &TantivyDocument, pf: PhysicalField) -> Vec<FieldValue> {
    doc.get_all(pf.field)
        .filter_map(|v| match pf.codec {
            FieldCodec::Text | FieldCodec::Keyword => v.as_str().map(FieldValue::from),
            FieldCodec::Long => v.as_i64().map(FieldValue::Long),
            FieldCodec::Double | FieldCodec::ScaledNumber { .. } => {
                v.as_f64().map(FieldValue::Double)
            }
            FieldCodec::Boolean => v.as_bool().map(FieldValue::Boolean),
            FieldCodec::GeoPoint => v.as_str().and_then(parse_point).map(FieldValue::GeoPoint),
        })
        .collect()
}

fn stored_points(doc: &TantivyDocument, pf: PhysicalField) -> Vec<GeoPoint> {
    stored_values(doc, pf)
        .iter()
        .filter_map(FieldValue::as_geo_point)
        .collect()
}

/// Parses a point stored as `lat,lon`.
fn parse_point(stored: &str) -> Option<GeoPoint> {
    let (lat, lon) = stored.split_once(',')?;
    Some(GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}
