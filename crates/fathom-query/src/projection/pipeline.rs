//! Two-phase hit processing.
//!
//! 1. **Request**: [`ProjectionPlan::new`] walks the projection tree once and
//!    registers the per-hit data it needs. Identical requirements share one
//!    slot, so a field used twice is extracted once.
//! 2. **Extract**: [`ProjectionPlan::extract`] runs per hit. Raw values are
//!    already laid out by slot; entity projections plan a load.
//! 3. **Transform**: [`ProjectionPlan::transform`] runs once the loads of the
//!    page are resolved and builds the final value.

use fathom_core::{DistanceUnit, FieldValue};

use super::{CombineFn, ProjectionNode, ProjectionValue, SearchProjection};
use crate::backend::{HitRequirement, RawHit, RawValue};
use crate::loading::{EntityLoader, LoadingContext, LoadingKey, LoadingResult};

enum Extractor<E> {
    Field { slot: usize, multi: bool },
    Distance { slot: usize, unit: DistanceUnit },
    Score,
    DocumentReference,
    EntityReference,
    Entity,
    List(Vec<Extractor<E>>),
    Function {
        children: Vec<Extractor<E>>,
        combine: CombineFn<E>,
    },
}

impl<E> Extractor<E> {
    fn needs_entity(&self) -> bool {
        match self {
            Extractor::Entity => true,
            Extractor::List(children) | Extractor::Function { children, .. } => {
                children.iter().any(Extractor::needs_entity)
            }
            _ => false,
        }
    }

    fn needs_score(&self) -> bool {
        match self {
            Extractor::Score => true,
            Extractor::List(children) | Extractor::Function { children, .. } => {
                children.iter().any(Extractor::needs_score)
            }
            _ => false,
        }
    }
}

/// The compiled form of a projection.
pub struct ProjectionPlan<E> {
    root: Extractor<E>,
    requirements: Vec<HitRequirement>,
    loads_entities: bool,
    track_scores: bool,
}

/// A hit after extraction.
#[derive(Debug, Clone)]
pub struct ExtractedHit {
    hit: RawHit,
    entity_key: Option<LoadingKey>,
}

/// A hit after transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedHit<E> {
    /// Projected value.
    pub value: ProjectionValue<E>,
    /// Whether an entity of this hit failed to load.
    pub failed_load: bool,
}

impl<E: Clone> ProjectionPlan<E> {
    /// Registers the requirements of `projection`.
    pub fn new(projection: &SearchProjection<E>) -> Self {
        let mut requirements = Vec::new();
        let root = Self::request(projection, &mut requirements);
        Self {
            loads_entities: root.needs_entity(),
            track_scores: root.needs_score(),
            root,
            requirements,
        }
    }

    fn request(projection: &SearchProjection<E>, requirements: &mut Vec<HitRequirement>) -> Extractor<E> {
        match projection.node() {
            ProjectionNode::FieldValue { field, multi } => Extractor::Field {
                slot: register(requirements, HitRequirement::FieldValues {
                    path: field.path().to_string(),
                }),
                multi: *multi,
            },
            ProjectionNode::Distance {
                field,
                center,
                unit,
            } => Extractor::Distance {
                slot: register(requirements, HitRequirement::Distance {
                    path: field.path().to_string(),
                    center: *center,
                }),
                unit: *unit,
            },
            ProjectionNode::Score => Extractor::Score,
            ProjectionNode::DocumentReference => Extractor::DocumentReference,
            ProjectionNode::EntityReference => Extractor::EntityReference,
            ProjectionNode::Entity => Extractor::Entity,
            ProjectionNode::CompositeList(children) => Extractor::List(
                children
                    .iter()
                    .map(|c| Self::request(c, requirements))
                    .collect(),
            ),
            ProjectionNode::CompositeFunction { children, combine } => Extractor::Function {
                children: children
                    .iter()
                    .map(|c| Self::request(c, requirements))
                    .collect(),
                combine: combine.clone(),
            },
        }
    }

    /// Per-hit data the backend must extract, indexed by slot.
    pub fn requirements(&self) -> &[HitRequirement] {
        &self.requirements
    }

    /// Whether the projection reads the score.
    pub fn track_scores(&self) -> bool {
        self.track_scores
    }

    /// Whether the projection loads entities.
    pub fn loads_entities(&self) -> bool {
        self.loads_entities
    }

    /// Extracts one hit, planning its entity load if needed.
    pub fn extract(&self, hit: RawHit, loading: &mut LoadingContext) -> ExtractedHit {
        let entity_key = self
            .loads_entities
            .then(|| loading.plan_loading(&hit.reference));
        ExtractedHit { hit, entity_key }
    }

    /// Builds the final value of an extracted hit.
    pub fn transform<L>(&self, hit: &ExtractedHit, loader: &L, loaded: &LoadingResult<E>) -> TransformedHit<E>
    where
        L: EntityLoader<E> + ?Sized,
    {
        let mut failed_load = false;
        let value = self.transform_node(&self.root, hit, loader, loaded, &mut failed_load);
        TransformedHit { value, failed_load }
    }

    fn transform_node<L>(
        &self,
        extractor: &Extractor<E>,
        hit: &ExtractedHit,
        loader: &L,
        loaded: &LoadingResult<E>,
        failed_load: &mut bool,
    ) -> ProjectionValue<E>
    where
        L: EntityLoader<E> + ?Sized,
    {
        match extractor {
            Extractor::Field { slot, multi } => field_value(hit.hit.value(*slot), *multi),
            Extractor::Distance { slot, unit } => match hit.hit.value(*slot) {
                RawValue::Distance(meters) => ProjectionValue::Distance(unit.from_meters(*meters)),
                _ => ProjectionValue::Null,
            },
            Extractor::Score => hit
                .hit
                .score
                .map_or(ProjectionValue::Null, ProjectionValue::Score),
            Extractor::DocumentReference => {
                ProjectionValue::DocumentReference(hit.hit.reference.clone())
            }
            Extractor::EntityReference => {
                ProjectionValue::EntityReference(loader.entity_reference(&hit.hit.reference))
            }
            Extractor::Entity => match hit.entity_key.and_then(|key| loaded.get(key)) {
                Some(entity) => ProjectionValue::Entity(entity.clone()),
                None => {
                    log::debug!("Entity of {} could not be loaded", hit.hit.reference);
                    *failed_load = true;
                    ProjectionValue::Null
                }
            },
            Extractor::List(children) => ProjectionValue::List(
                children
                    .iter()
                    .map(|c| self.transform_node(c, hit, loader, loaded, failed_load))
                    .collect(),
            ),
            Extractor::Function { children, combine } => {
                let values = children
                    .iter()
                    .map(|c| self.transform_node(c, hit, loader, loaded, failed_load))
                    .collect();
                combine(values)
            }
        }
    }
}

/// Slot of `requirement`, registering it on first use.
fn register(requirements: &mut Vec<HitRequirement>, requirement: HitRequirement) -> usize {
    match requirements.iter().position(|r| *r == requirement) {
        Some(slot) => slot,
        None => {
            requirements.push(requirement);
            requirements.len() - 1
        }
    }
}

fn field_value<E>(raw: &RawValue, multi: bool) -> ProjectionValue<E> {
    match (raw, multi) {
        (RawValue::Values(values), true) => ProjectionValue::Values(values.clone()),
        (RawValue::Values(values), false) => values
            .first()
            .cloned()
            .map_or(ProjectionValue::Null, ProjectionValue::Value),
        (_, true) => ProjectionValue::Values(Vec::<FieldValue>::new()),
        (_, false) => ProjectionValue::Null,
    }
}
