//! Sort compilation and hit ordering.
//!
//! Sorts are applied after collection: every matching document is loaded,
//! its sort keys computed, and the hits stably sorted before pagination.

use std::cmp::Ordering;

use fathom_core::{FieldContext, FieldValue, GeoPoint, Result, SortOrder};
use fathom_query::{MissingValue, SortNode};

use crate::schema::{PhysicalField, PhysicalSchema};

/// A compiled sort element.
#[derive(Debug, Clone, PartialEq)]
pub enum TantivySort {
    /// By relevance score.
    Score {
        /// Direction.
        order: SortOrder,
    },
    /// By the stored value of a field.
    Field {
        /// Physical field of each declaring index.
        fields: Vec<(String, PhysicalField)>,
        /// Direction.
        order: SortOrder,
        /// Placement of documents without a value.
        missing: MissingValue,
    },
    /// By distance to a center.
    Distance {
        /// Physical field of each declaring index.
        fields: Vec<(String, PhysicalField)>,
        /// Reference point.
        center: GeoPoint,
        /// Direction.
        order: SortOrder,
    },
}

impl TantivySort {
    /// Compiles a sort element against the physical schema.
    pub fn compile(schema: &PhysicalSchema, node: &SortNode) -> Result<Self> {
        let physical = |field: &FieldContext| -> Vec<(String, PhysicalField)> {
            field
                .members()
                .iter()
                .filter_map(|m| {
                    schema
                        .field(&m.index, field.path())
                        .map(|pf| (m.index.clone(), pf))
                })
                .collect()
        };
        Ok(match node {
            SortNode::Score { order } => TantivySort::Score { order: *order },
            SortNode::Field {
                field,
                order,
                missing,
            } => TantivySort::Field {
                fields: physical(field),
                order: *order,
                missing: *missing,
            },
            SortNode::Distance {
                field,
                center,
                order,
            } => TantivySort::Distance {
                fields: physical(field),
                center: *center,
                order: *order,
            },
        })
    }

    /// Whether this element needs relevance scores.
    pub fn needs_score(&self) -> bool {
        matches!(self, TantivySort::Score { .. })
    }

    /// The physical field holding this element's values in `index`.
    pub fn field_for(&self, index: &str) -> Option<PhysicalField> {
        match self {
            TantivySort::Score { .. } => None,
            TantivySort::Field { fields, .. } | TantivySort::Distance { fields, .. } => fields
                .iter()
                .find(|(name, _)| name == index)
                .map(|(_, field)| *field),
        }
    }
}

/// The sort key of one hit for one element.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// Relevance score.
    Score(f32),
    /// A field value, absent if the document holds none.
    Value(Option<FieldValue>),
    /// A distance in meters, absent if the document holds no point.
    Distance(Option<f64>),
}

impl SortKey {
    /// Builds the key of a field element from a document's values.
    ///
    /// Multi-valued fields sort by their smallest value ascending and by
    /// their largest value descending.
    pub fn from_values(values: &[FieldValue], order: SortOrder) -> Self {
        let picked = match order {
            SortOrder::Asc => values.iter().min_by(|a, b| compare_values(a, b)),
            SortOrder::Desc => values.iter().max_by(|a, b| compare_values(a, b)),
        };
        SortKey::Value(picked.cloned())
    }

    /// Builds the key of a distance element from a document's points.
    pub fn from_points(points: &[GeoPoint], center: &GeoPoint) -> Self {
        let nearest = points
            .iter()
            .map(|p| p.distance_to(center))
            .min_by(f64::total_cmp);
        SortKey::Distance(nearest)
    }
}

/// Compares two hits' keys element by element.
pub fn compare_keys(sorts: &[TantivySort], a: &[SortKey], b: &[SortKey]) -> Ordering {
    for (sort, (ka, kb)) in sorts.iter().zip(a.iter().zip(b)) {
        let ordering = match (sort, ka, kb) {
            (TantivySort::Score { order }, SortKey::Score(x), SortKey::Score(y)) => {
                order.apply(x.total_cmp(y))
            }
            (TantivySort::Field { order, missing, .. }, SortKey::Value(x), SortKey::Value(y)) => {
                match (x, y) {
                    (Some(x), Some(y)) => order.apply(compare_values(x, y)),
                    (None, None) => Ordering::Equal,
                    // Missing placement ignores the direction.
                    (None, Some(_)) => match missing {
                        MissingValue::First => Ordering::Less,
                        MissingValue::Last => Ordering::Greater,
                    },
                    (Some(_), None) => match missing {
                        MissingValue::First => Ordering::Greater,
                        MissingValue::Last => Ordering::Less,
                    },
                }
            }
            (TantivySort::Distance { order, .. }, SortKey::Distance(x), SortKey::Distance(y)) => {
                match (x, y) {
                    (Some(x), Some(y)) => order.apply(x.total_cmp(y)),
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                }
            }
            _ => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Orders values of the same field.
pub fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Long(x), FieldValue::Long(y)) => x.cmp(y),
        (FieldValue::String(x), FieldValue::String(y)) => x.cmp(y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
