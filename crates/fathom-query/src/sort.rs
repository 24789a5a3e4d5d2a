//! Sort DSL.
//!
//! A [`SearchSort`] is an ordered list of sort elements; hits are compared by
//! the first element, ties are broken by the next one.

use std::sync::Arc;

use fathom_core::{
    Error, FieldCodec, FieldContext, GeoPoint, IndexScope, Result, SortOrder,
};

use crate::backend::BackendAdapter;

/// Where documents without a value go in a field sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValue {
    /// Before documents with a value.
    First,
    /// After documents with a value.
    #[default]
    Last,
}

/// One sort element.
#[derive(Debug, Clone)]
pub enum SortNode {
    /// By relevance score.
    Score {
        /// Direction; descending puts the best match first.
        order: SortOrder,
    },
    /// By the value of a field.
    Field {
        /// Sorted field.
        field: Arc<FieldContext>,
        /// Direction.
        order: SortOrder,
        /// Placement of documents without a value.
        missing: MissingValue,
    },
    /// By distance between a geo-point field and a center.
    Distance {
        /// Geo-point field.
        field: Arc<FieldContext>,
        /// Reference point.
        center: GeoPoint,
        /// Direction.
        order: SortOrder,
    },
}

/// An immutable, composable sort.
#[derive(Debug, Clone)]
pub struct SearchSort {
    elements: Arc<[SortNode]>,
    index_names: Arc<[String]>,
}

impl SearchSort {
    fn single(node: SortNode, scope: &IndexScope) -> Self {
        Self {
            elements: Arc::from(vec![node]),
            index_names: scope.index_names().into(),
        }
    }

    /// Sort elements, most significant first.
    pub fn elements(&self) -> &[SortNode] {
        &self.elements
    }

    /// Indexes of the scope this sort was built for.
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// Appends `next` as a tie-breaker.
    ///
    /// Both sorts must come from the same scope.
    pub fn then(self, next: SearchSort) -> Result<Self> {
        if self.index_names != next.index_names {
            return Err(Error::IndexScopeMismatch {
                kind: "Sort".to_string(),
                declared: next.index_names.to_vec(),
                requested: self.index_names.to_vec(),
            });
        }
        let elements: Vec<SortNode> = self
            .elements
            .iter()
            .chain(next.elements.iter())
            .cloned()
            .collect();
        Ok(Self {
            elements: elements.into(),
            index_names: self.index_names,
        })
    }

    /// Compiles every element into the backend's native sort.
    pub fn compile<B>(&self, scope: &IndexScope, backend: &B) -> Result<Vec<B::Sort>>
    where
        B: BackendAdapter + ?Sized,
    {
        self.elements
            .iter()
            .map(|node| backend.sort(scope, node))
            .collect()
    }
}

/// Entry point of the sort DSL, bound to one index scope.
#[derive(Debug, Clone, Copy)]
pub struct SortFactory<'s> {
    scope: &'s IndexScope,
}

impl<'s> SortFactory<'s> {
    /// Creates a factory for `scope`.
    pub fn new(scope: &'s IndexScope) -> Self {
        Self { scope }
    }

    /// Sorts by score, best first.
    pub fn score(&self) -> ScoreSortBuilder<'s> {
        ScoreSortBuilder {
            scope: self.scope,
            order: SortOrder::Desc,
        }
    }

    /// Sorts by a field value, ascending.
    pub fn field(&self, path: &str) -> Result<FieldSortBuilder<'s>> {
        let (field, codec) = self.sortable_field(path)?;
        if codec == FieldCodec::GeoPoint {
            return Err(Error::unsupported(path, "Field sorts", codec));
        }
        Ok(FieldSortBuilder {
            scope: self.scope,
            field,
            order: SortOrder::Asc,
            missing: MissingValue::default(),
        })
    }

    /// Sorts by distance to `center`, closest first.
    pub fn distance(&self, path: &str, center: GeoPoint) -> Result<DistanceSortBuilder<'s>> {
        let (field, codec) = self.sortable_field(path)?;
        if codec != FieldCodec::GeoPoint {
            return Err(Error::unsupported(path, "Distance sorts", codec));
        }
        if !center.is_valid() {
            return Err(Error::invalid_value(path, format!("invalid center {center}")));
        }
        Ok(DistanceSortBuilder {
            scope: self.scope,
            field,
            center,
            order: SortOrder::Asc,
        })
    }

    fn sortable_field(&self, path: &str) -> Result<(Arc<FieldContext>, FieldCodec)> {
        let field = self.scope.field(path)?;
        let codec = field.codec()?;
        field.require_sortable()?;
        Ok((Arc::clone(field), codec))
    }
}

/// Builder of a score sort.
#[derive(Debug, Clone)]
pub struct ScoreSortBuilder<'s> {
    scope: &'s IndexScope,
    order: SortOrder,
}

impl ScoreSortBuilder<'_> {
    /// Lowest score first.
    pub fn asc(mut self) -> Self {
        self.order = SortOrder::Asc;
        self
    }

    /// Highest score first.
    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    /// Finishes the sort.
    pub fn to_sort(self) -> SearchSort {
        SearchSort::single(SortNode::Score { order: self.order }, self.scope)
    }
}

/// Builder of a field sort.
#[derive(Debug, Clone)]
pub struct FieldSortBuilder<'s> {
    scope: &'s IndexScope,
    field: Arc<FieldContext>,
    order: SortOrder,
    missing: MissingValue,
}

impl FieldSortBuilder<'_> {
    /// Smallest value first.
    pub fn asc(mut self) -> Self {
        self.order = SortOrder::Asc;
        self
    }

    /// Largest value first.
    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    /// Documents without a value come first.
    pub fn missing_first(mut self) -> Self {
        self.missing = MissingValue::First;
        self
    }

    /// Documents without a value come last.
    pub fn missing_last(mut self) -> Self {
        self.missing = MissingValue::Last;
        self
    }

    /// Finishes the sort.
    pub fn to_sort(self) -> SearchSort {
        SearchSort::single(
            SortNode::Field {
                field: self.field,
                order: self.order,
                missing: self.missing,
            },
            self.scope,
        )
    }
}

/// Builder of a distance sort.
#[derive(Debug, Clone)]
pub struct DistanceSortBuilder<'s> {
    scope: &'s IndexScope,
    field: Arc<FieldContext>,
    center: GeoPoint,
    order: SortOrder,
}

impl DistanceSortBuilder<'_> {
    /// Closest first.
    pub fn asc(mut self) -> Self {
        self.order = SortOrder::Asc;
        self
    }

    /// Farthest first.
    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    /// Finishes the sort.
    pub fn to_sort(self) -> SearchSort {
        SearchSort::single(
            SortNode::Distance {
                field: self.field,
                center: self.center,
                order: self.order,
            },
            self.scope,
        )
    }
}
