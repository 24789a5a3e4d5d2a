//! Projection Builder Tree.
//!
//! A projection describes what a query returns for each hit. Leaves read
//! per-hit data (a field, the score, a distance) or the loaded entity;
//! composites combine their children positionally.
//!
//! Results are produced in two phases, see [`ProjectionPlan`]: extraction
//! pulls raw data and plans entity loads hit by hit, transformation runs once
//! every load of the page has been resolved.

mod factory;
mod pipeline;

pub use factory::{DistanceProjectionBuilder, FieldProjectionBuilder, ProjectionFactory};
pub use pipeline::{ExtractedHit, ProjectionPlan, TransformedHit};

use std::fmt;
use std::sync::Arc;

use fathom_core::{DistanceUnit, FieldContext, FieldValue, GeoPoint};

use crate::loading::{DocumentReference, EntityReference};

/// Combines the values of a composite's children.
pub type CombineFn<E> = Arc<dyn Fn(Vec<ProjectionValue<E>>) -> ProjectionValue<E> + Send + Sync>;

/// The value a projection produces for one hit.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionValue<E> {
    /// Nothing: missing field value, or an entity that failed to load.
    Null,
    /// A single field value.
    Value(FieldValue),
    /// All values of a multi-valued field.
    Values(Vec<FieldValue>),
    /// Relevance score.
    Score(f32),
    /// Distance, in the projection's unit.
    Distance(f64),
    /// Reference of the matched document.
    DocumentReference(DocumentReference),
    /// Reference of the matched entity.
    EntityReference(EntityReference),
    /// Loaded entity.
    Entity(E),
    /// Values of a composite list, in declaration order.
    List(Vec<ProjectionValue<E>>),
}

impl<E> ProjectionValue<E> {
    /// Whether this is [`ProjectionValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ProjectionValue::Null)
    }

    /// The field value, if this is a single value.
    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            ProjectionValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The entity, if this is a loaded entity.
    pub fn as_entity(&self) -> Option<&E> {
        match self {
            ProjectionValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the value, returning the entity if there is one.
    pub fn into_entity(self) -> Option<E> {
        match self {
            ProjectionValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[ProjectionValue<E>]> {
        match self {
            ProjectionValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A projection node, tagged by kind.
pub enum ProjectionNode<E> {
    /// Stored value(s) of a field.
    FieldValue {
        /// Projected field.
        field: Arc<FieldContext>,
        /// Whether every value is returned rather than the first one.
        multi: bool,
    },
    /// Relevance score.
    Score,
    /// Reference of the matched document.
    DocumentReference,
    /// Reference of the matched entity.
    EntityReference,
    /// Loaded entity.
    Entity,
    /// Distance between a geo-point field and a center.
    Distance {
        /// Geo-point field.
        field: Arc<FieldContext>,
        /// Reference point.
        center: GeoPoint,
        /// Unit of the returned distance.
        unit: DistanceUnit,
    },
    /// The children's values as a list.
    CompositeList(Vec<SearchProjection<E>>),
    /// The children's values combined by a function.
    CompositeFunction {
        /// Children, in argument order.
        children: Vec<SearchProjection<E>>,
        /// Combining function.
        combine: CombineFn<E>,
    },
}

impl<E> fmt::Debug for ProjectionNode<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionNode::FieldValue { field, multi } => f
                .debug_struct("FieldValue")
                .field("field", &field.path())
                .field("multi", multi)
                .finish(),
            ProjectionNode::Score => f.write_str("Score"),
            ProjectionNode::DocumentReference => f.write_str("DocumentReference"),
            ProjectionNode::EntityReference => f.write_str("EntityReference"),
            ProjectionNode::Entity => f.write_str("Entity"),
            ProjectionNode::Distance {
                field,
                center,
                unit,
            } => f
                .debug_struct("Distance")
                .field("field", &field.path())
                .field("center", center)
                .field("unit", unit)
                .finish(),
            ProjectionNode::CompositeList(children) => {
                f.debug_tuple("CompositeList").field(children).finish()
            }
            ProjectionNode::CompositeFunction { children, .. } => {
                f.debug_tuple("CompositeFunction").field(children).finish()
            }
        }
    }
}

/// A finished, immutable projection producing values for entity type `E`.
pub struct SearchProjection<E> {
    node: Arc<ProjectionNode<E>>,
    index_names: Arc<[String]>,
}

impl<E> Clone for SearchProjection<E> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            index_names: Arc::clone(&self.index_names),
        }
    }
}

impl<E> fmt::Debug for SearchProjection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchProjection")
            .field("node", &self.node)
            .field("index_names", &self.index_names)
            .finish()
    }
}

impl<E> SearchProjection<E> {
    pub(crate) fn new(node: ProjectionNode<E>, index_names: Vec<String>) -> Self {
        Self {
            node: Arc::new(node),
            index_names: index_names.into(),
        }
    }

    /// The root node.
    pub fn node(&self) -> &ProjectionNode<E> {
        &self.node
    }

    /// Indexes this projection accepts.
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }
}
