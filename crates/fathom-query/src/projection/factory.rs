use std::marker::PhantomData;
use std::sync::Arc;

use fathom_core::{
    DistanceUnit, Error, FieldCodec, FieldContext, GeoPoint, IndexScope, Result,
};

use super::{CombineFn, ProjectionNode, ProjectionValue, SearchProjection};

/// Entry point of the projection DSL, bound to one index scope.
pub struct ProjectionFactory<'s, E> {
    scope: &'s IndexScope,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for ProjectionFactory<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ProjectionFactory<'_, E> {}

impl<'s, E> ProjectionFactory<'s, E> {
    /// Creates a factory for `scope`.
    pub fn new(scope: &'s IndexScope) -> Self {
        Self {
            scope,
            _entity: PhantomData,
        }
    }

    fn leaf(&self, node: ProjectionNode<E>) -> SearchProjection<E> {
        SearchProjection::new(node, self.scope.index_names().to_vec())
    }

    /// The first stored value of a field.
    pub fn field(&self, path: &str) -> Result<FieldProjectionBuilder<'s, E>> {
        let (field, _) = self.projectable_field(path)?;
        Ok(FieldProjectionBuilder {
            factory: *self,
            field,
            multi: false,
        })
    }

    /// The relevance score.
    pub fn score(&self) -> SearchProjection<E> {
        self.leaf(ProjectionNode::Score)
    }

    /// The reference of the matched document.
    pub fn document_reference(&self) -> SearchProjection<E> {
        self.leaf(ProjectionNode::DocumentReference)
    }

    /// The reference of the matched entity.
    pub fn entity_reference(&self) -> SearchProjection<E> {
        self.leaf(ProjectionNode::EntityReference)
    }

    /// The loaded entity.
    pub fn entity(&self) -> SearchProjection<E> {
        self.leaf(ProjectionNode::Entity)
    }

    /// The distance between a geo-point field and `center`, in meters.
    pub fn distance(&self, path: &str, center: GeoPoint) -> Result<DistanceProjectionBuilder<'s, E>> {
        let (field, codec) = self.projectable_field(path)?;
        if codec != FieldCodec::GeoPoint {
            return Err(Error::unsupported(path, "Distance projections", codec));
        }
        if !center.is_valid() {
            return Err(Error::invalid_value(path, format!("invalid center {center}")));
        }
        Ok(DistanceProjectionBuilder {
            factory: *self,
            field,
            center,
            unit: DistanceUnit::default(),
        })
    }

    /// The children's values as a [`ProjectionValue::List`].
    ///
    /// Every child must accept every index of the scope.
    pub fn composite(&self, children: Vec<SearchProjection<E>>) -> Result<SearchProjection<E>> {
        let index_names = self.composite_indexes(&children)?;
        Ok(SearchProjection::new(
            ProjectionNode::CompositeList(children),
            index_names,
        ))
    }

    /// The children's values combined by `combine`.
    pub fn composite_with<F>(
        &self,
        children: Vec<SearchProjection<E>>,
        combine: F,
    ) -> Result<SearchProjection<E>>
    where
        F: Fn(Vec<ProjectionValue<E>>) -> ProjectionValue<E> + Send + Sync + 'static,
    {
        let index_names = self.composite_indexes(&children)?;
        let combine: CombineFn<E> = Arc::new(combine);
        Ok(SearchProjection::new(
            ProjectionNode::CompositeFunction { children, combine },
            index_names,
        ))
    }

    /// Union of the children's index names, first occurrence first.
    fn composite_indexes(&self, children: &[SearchProjection<E>]) -> Result<Vec<String>> {
        if children.is_empty() {
            return Err(Error::invalid_argument(
                "a composite projection needs at least one child",
            ));
        }
        let mut names: Vec<String> = Vec::new();
        for child in children {
            self.scope
                .check_covered_by("Projection", child.index_names())?;
            for name in child.index_names() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        Ok(names)
    }

    fn projectable_field(&self, path: &str) -> Result<(Arc<FieldContext>, FieldCodec)> {
        let field = self.scope.field(path)?;
        let codec = field.codec()?;
        field.require_projectable()?;
        Ok((Arc::clone(field), codec))
    }
}

/// Builder of a field projection.
pub struct FieldProjectionBuilder<'s, E> {
    factory: ProjectionFactory<'s, E>,
    field: Arc<FieldContext>,
    multi: bool,
}

impl<E> FieldProjectionBuilder<'_, E> {
    /// Returns every value of the field as [`ProjectionValue::Values`].
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Finishes the projection.
    pub fn to_projection(self) -> SearchProjection<E> {
        self.factory.leaf(ProjectionNode::FieldValue {
            field: self.field,
            multi: self.multi,
        })
    }
}

/// Builder of a distance projection.
pub struct DistanceProjectionBuilder<'s, E> {
    factory: ProjectionFactory<'s, E>,
    field: Arc<FieldContext>,
    center: GeoPoint,
    unit: DistanceUnit,
}

impl<E> DistanceProjectionBuilder<'_, E> {
    /// Unit of the returned distance.
    pub fn unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Finishes the projection.
    pub fn to_projection(self) -> SearchProjection<E> {
        self.factory.leaf(ProjectionNode::Distance {
            field: self.field,
            center: self.center,
            unit: self.unit,
        })
    }
}
