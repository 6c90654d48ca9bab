mod builder;
pub use builder::{
    passes, DerivedRelationalModelSetBuilder, NameOverrideKind, NameOverrides,
    RelationalModelBuilderContext, RelationalModelSetBuilderContext, RelationalModelSetPass,
    ResourceStep,
};

mod collision;
pub use collision::{IdentifierScope, OverrideCollisionDetector};

mod constraint_naming;

pub mod db;

mod descriptor_paths;
pub use descriptor_paths::{
    resolve_descriptor_paths, DescriptorPathInfo, DescriptorPathMap, ResourceDescriptorPaths,
};

mod dialect;
pub use dialect::{
    MssqlDialectRules, NameScope, PgsqlDialectRules, SqlDialect, SqlDialectRules, CORE_SCHEMA_NAME,
};

mod hash;

pub mod input;

pub mod name;

mod normalize;
pub use normalize::{
    normalize, NormalizedSchemaSet, ProjectSchemaContext, ProjectSchemaInfo,
};

pub mod ordering;

mod path;
pub use path::{JsonPath, JsonPathSegment};

mod qualified_name;
pub use qualified_name::QualifiedResourceName;

mod scalar_type;

mod verify;

use crate::effective::EffectiveSchemaInfo;
use db::{
    AbstractIdentityTableInfo, AbstractUnionViewInfo, ConcreteResourceModel, DbIndexInfo,
    DbTriggerInfo,
};

/// The complete, dialect-specific relational model of an effective schema
/// set.
///
/// Produced once by [`RelationalModelSetBuilderContext::build_result`]. Every
/// collection is in canonical order, so two builds over the same input
/// compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRelationalModelSet {
    pub effective_schema: EffectiveSchemaInfo,

    pub dialect: SqlDialect,

    pub project_schemas_in_endpoint_order: Vec<ProjectSchemaInfo>,

    /// Ordered by (project, resource)
    pub concrete_resources_in_name_order: Vec<ConcreteResourceModel>,

    pub abstract_identity_tables_in_name_order: Vec<AbstractIdentityTableInfo>,

    pub abstract_union_views_in_name_order: Vec<AbstractUnionViewInfo>,

    /// Ordered by (schema, table, name)
    pub indexes_in_create_order: Vec<DbIndexInfo>,

    /// Ordered by (schema, table, name)
    pub triggers_in_create_order: Vec<DbTriggerInfo>,
}

impl DerivedRelationalModelSet {
    pub fn builder() -> DerivedRelationalModelSetBuilder {
        DerivedRelationalModelSetBuilder::default()
    }

    pub fn resource(&self, name: &QualifiedResourceName) -> Option<&ConcreteResourceModel> {
        self.concrete_resources_in_name_order
            .binary_search_by(|model| model.resource().cmp(name))
            .ok()
            .map(|index| &self.concrete_resources_in_name_order[index])
    }

    pub fn abstract_identity_table(
        &self,
        name: &QualifiedResourceName,
    ) -> Option<&AbstractIdentityTableInfo> {
        self.abstract_identity_tables_in_name_order
            .iter()
            .find(|info| &info.abstract_resource == name)
    }

    pub fn abstract_union_view(&self, name: &QualifiedResourceName) -> Option<&AbstractUnionViewInfo> {
        self.abstract_union_views_in_name_order
            .iter()
            .find(|info| &info.abstract_resource == name)
    }
}
