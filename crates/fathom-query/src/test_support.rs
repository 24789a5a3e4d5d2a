//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use fathom_core::{
    AnalysisRegistry, FieldDescriptor, IndexSchema, IndexScope, ObjectStructure, QueryConfig,
    SchemaRegistry,
};

/// Indexes:
/// - `main`: every field kind, a nested and a flattened object;
/// - `compatible`: same declarations as `main` for the fields it has;
/// - `conflicting`: `title` with another analyzer, `tag` without normalizer,
///   `year` as a double.
pub(crate) fn registry() -> SchemaRegistry {
    SchemaRegistry::new(AnalysisRegistry::default())
        .with_index(
            IndexSchema::new("main")
                .with_field("title", FieldDescriptor::text("standard_english"))
                .with_field("body", FieldDescriptor::text("standard_english"))
                .with_field("tag", FieldDescriptor::keyword().with_normalizer("lowercase"))
                .with_field("year", FieldDescriptor::long())
                .with_field("price", FieldDescriptor::scaled_number(2))
                .with_field("rating", FieldDescriptor::double())
                .with_field("available", FieldDescriptor::boolean())
                .with_field("location", FieldDescriptor::geo_point())
                .with_field(
                    "secret",
                    FieldDescriptor::keyword().searchable(false).projectable(false),
                )
                .with_field("authors.name", FieldDescriptor::keyword())
                .with_field("authors.age", FieldDescriptor::long())
                .with_object("authors", ObjectStructure::Nested)
                .with_field("publisher.name", FieldDescriptor::keyword())
                .with_object("publisher", ObjectStructure::Flattened),
        )
        .unwrap()
        .with_index(
            IndexSchema::new("compatible")
                .with_field("title", FieldDescriptor::text("standard_english"))
                .with_field("tag", FieldDescriptor::keyword().with_normalizer("lowercase"))
                .with_field("year", FieldDescriptor::long()),
        )
        .unwrap()
        .with_index(
            IndexSchema::new("conflicting")
                .with_field("title", FieldDescriptor::text("whitespace"))
                .with_field("tag", FieldDescriptor::keyword())
                .with_field("year", FieldDescriptor::double()),
        )
        .unwrap()
}

pub(crate) fn scope(indexes: &[&str]) -> IndexScope {
    IndexScope::resolve(&registry(), indexes).unwrap()
}

pub(crate) fn config() -> QueryConfig {
    QueryConfig::default()
}
