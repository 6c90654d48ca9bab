use super::resource::{default_steps, RelationalModelBuilderContext};
use crate::{
    effective::{EffectiveSchemaInfo, EffectiveSchemaSet},
    schema::{
        db::{
            AbstractIdentityTableInfo, AbstractUnionViewInfo, ConcreteResourceModel, DbIndexInfo,
            DbTableModel, DbTriggerInfo, ExtensionSite,
        },
        normalize, ordering, resolve_descriptor_paths, verify, DerivedRelationalModelSet,
        DescriptorPathMap, NormalizedSchemaSet, OverrideCollisionDetector, ProjectSchemaInfo,
        QualifiedResourceName, ResourceDescriptorPaths, SqlDialect, SqlDialectRules,
    },
    Error, Result,
};

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// Mutable state shared by every set-level pass of one build.
///
/// Construction normalizes and validates the input; [`build_result`]
/// consumes the context. Caches here are insert-once.
///
/// [`build_result`]: RelationalModelSetBuilderContext::build_result
#[derive(Debug)]
pub struct RelationalModelSetBuilderContext<'a> {
    pub(crate) rules: &'a dyn SqlDialectRules,

    pub(crate) dialect: SqlDialect,

    pub(crate) effective_schema: EffectiveSchemaInfo,

    pub(crate) schema: NormalizedSchemaSet,

    /// Keyed by endpoint name, in endpoint order
    pub(crate) project_infos: IndexMap<String, ProjectSchemaInfo>,

    pub(crate) descriptor_paths: BTreeMap<QualifiedResourceName, ResourceDescriptorPaths>,

    combined_descriptor_paths: HashMap<QualifiedResourceName, DescriptorPathMap>,

    pub(crate) resource_builders: IndexMap<QualifiedResourceName, RelationalModelBuilderContext>,

    pub(crate) concrete_resources: Vec<ConcreteResourceModel>,

    pub(crate) abstract_identity_tables: Vec<AbstractIdentityTableInfo>,

    pub(crate) abstract_union_views: Vec<AbstractUnionViewInfo>,

    pub(crate) indexes: Vec<DbIndexInfo>,

    pub(crate) triggers: Vec<DbTriggerInfo>,

    extension_sites: BTreeMap<QualifiedResourceName, Vec<ExtensionSite>>,

    /// Lowercased project key to endpoint name
    pub(super) extension_project_keys: HashMap<String, String>,

    pub(crate) collision_detector: OverrideCollisionDetector,
}

impl<'a> RelationalModelSetBuilderContext<'a> {
    /// Validates `effective` against `dialect` and `rules`.
    ///
    /// The dialect check happens before any schema is read.
    pub fn new(
        effective: &EffectiveSchemaSet,
        dialect: SqlDialect,
        rules: &'a dyn SqlDialectRules,
    ) -> Result<Self> {
        if rules.dialect() != dialect {
            return Err(Error::dialect_mismatch(dialect, rules.dialect()));
        }

        let schema = normalize(effective)?;
        let descriptor_paths = resolve_descriptor_paths(&schema);

        let project_infos = schema
            .projects
            .iter()
            .map(|project| {
                (
                    project.info.project_endpoint_name.clone(),
                    project.info.clone(),
                )
            })
            .collect();

        log::debug!(
            "builder context ready: dialect={dialect}, projects={}",
            schema.projects.len()
        );

        Ok(RelationalModelSetBuilderContext {
            rules,
            dialect,
            effective_schema: effective.effective_schema.clone(),
            schema,
            project_infos,
            descriptor_paths,
            combined_descriptor_paths: HashMap::new(),
            resource_builders: IndexMap::new(),
            concrete_resources: vec![],
            abstract_identity_tables: vec![],
            abstract_union_views: vec![],
            indexes: vec![],
            triggers: vec![],
            extension_sites: BTreeMap::new(),
            extension_project_keys: HashMap::new(),
            collision_detector: OverrideCollisionDetector::new(),
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn rules(&self) -> &dyn SqlDialectRules {
        self.rules
    }

    pub fn schema(&self) -> &NormalizedSchemaSet {
        &self.schema
    }

    pub fn project_schema_infos(&self) -> impl Iterator<Item = &ProjectSchemaInfo> {
        self.project_infos.values()
    }

    /// The project declaring resources under `project_name`.
    pub fn project_info_by_name(&self, project_name: &str) -> Option<&ProjectSchemaInfo> {
        self.project_infos
            .values()
            .find(|info| info.project_name == project_name)
    }

    /// Replaces the info of project `endpoint` with an edited copy.
    pub fn update_project_schema_info(
        &mut self,
        endpoint: &str,
        f: impl FnOnce(&mut ProjectSchemaInfo),
    ) -> Result<()> {
        let Some(existing) = self.project_infos.get(endpoint) else {
            return Err(Error::invalid_schema(format!(
                "Project endpoint '{endpoint}' is not part of this build"
            )));
        };

        let mut info = existing.clone();
        f(&mut info);
        self.project_infos.insert(endpoint.to_string(), info);
        Ok(())
    }

    /// Physical schema of the project owning `resource`.
    pub fn physical_schema_for(&self, resource: &QualifiedResourceName) -> Result<String> {
        self.project_info_by_name(&resource.project_name)
            .map(|info| info.physical_schema.clone())
            .ok_or_else(|| {
                Error::invalid_schema(format!(
                    "Resource '{resource}' belongs to unknown project '{}'",
                    resource.project_name
                ))
            })
    }

    /// Combined base and extension descriptor paths of `resource`.
    pub fn descriptor_paths_for(&mut self, resource: &QualifiedResourceName) -> &DescriptorPathMap {
        let paths = &self.descriptor_paths;
        self.combined_descriptor_paths
            .entry(resource.clone())
            .or_insert_with(|| {
                paths
                    .get(resource)
                    .map(ResourceDescriptorPaths::combined)
                    .unwrap_or_default()
            })
    }

    /// The per-resource builder for `resource`, running its pipeline on first
    /// use.
    pub fn resource_builder(
        &mut self,
        resource: &QualifiedResourceName,
    ) -> Result<&mut RelationalModelBuilderContext> {
        if !self.resource_builders.contains_key(resource) {
            let Some(schema) = self.schema.resource(resource).cloned() else {
                return Err(Error::invalid_schema(format!(
                    "Resource '{resource}' is not declared by any project"
                )));
            };

            let physical_schema = self.physical_schema_for(resource)?;
            let descriptor_paths = self.descriptor_paths_for(resource).clone();
            let mut builder = RelationalModelBuilderContext::new(
                schema,
                physical_schema,
                self.rules.core_schema_name().to_string(),
                descriptor_paths,
            );

            builder.run(&default_steps()).map_err(|e| {
                e.context(crate::err!("deriving tables for resource '{resource}'"))
            })?;

            log::debug!(
                "resource {resource}: {} tables, {} descriptor edges",
                builder.tables.len(),
                builder.descriptor_edge_sources.len()
            );

            self.resource_builders.insert(resource.clone(), builder);
        }

        self.resource_builders
            .get_mut(resource)
            .ok_or_else(|| crate::err!("resource builder for '{resource}' was not cached"))
    }

    pub fn concrete_resource(&self, resource: &QualifiedResourceName) -> Option<&ConcreteResourceModel> {
        self.concrete_resources
            .iter()
            .find(|model| model.resource() == resource)
    }

    pub fn concrete_resource_mut(
        &mut self,
        resource: &QualifiedResourceName,
    ) -> Option<&mut ConcreteResourceModel> {
        self.concrete_resources
            .iter_mut()
            .find(|model| model.resource() == resource)
    }

    /// Adds a concrete resource; each resource is registered once.
    pub fn register_concrete_resource(&mut self, model: ConcreteResourceModel) -> Result<()> {
        if self.concrete_resource(model.resource()).is_some() {
            return Err(Error::uniqueness_violation(format!(
                "Concrete resource '{}' is already registered",
                model.resource()
            )));
        }
        self.concrete_resources.push(model);
        Ok(())
    }

    /// Records the extension sites of `resource`; each resource is
    /// registered once.
    pub fn register_extension_sites(
        &mut self,
        resource: &QualifiedResourceName,
        sites: Vec<ExtensionSite>,
    ) -> Result<()> {
        if self.extension_sites.contains_key(resource) {
            return Err(Error::invalid_schema(format!(
                "Extension sites already registered for resource '{resource}'"
            )));
        }
        self.extension_sites.insert(resource.clone(), sites);
        Ok(())
    }

    pub fn extension_sites(&self, resource: &QualifiedResourceName) -> &[ExtensionSite] {
        self.extension_sites
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every derived table: resource tables, then abstract identity tables.
    pub(crate) fn tables(&self) -> impl Iterator<Item = &DbTableModel> {
        self.concrete_resources
            .iter()
            .flat_map(|model| &model.relational_model.tables)
            .chain(self.abstract_identity_tables.iter().map(|info| &info.table))
    }

    pub(crate) fn tables_mut(&mut self) -> impl Iterator<Item = &mut DbTableModel> {
        self.concrete_resources
            .iter_mut()
            .flat_map(|model| &mut model.relational_model.tables)
            .chain(
                self.abstract_identity_tables
                    .iter_mut()
                    .map(|info| &mut info.table),
            )
    }

    /// Validates the accumulated state and produces the final model.
    pub fn build_result(mut self) -> Result<DerivedRelationalModelSet> {
        for model in &mut self.concrete_resources {
            if let Some(sites) = self.extension_sites.remove(model.resource()) {
                model.extension_sites = sites;
            }
        }

        for table in self.tables_mut() {
            ordering::canonicalize_table(table);
        }

        ordering::sort_resources(&mut self.concrete_resources);
        ordering::sort_abstract_identity_tables(&mut self.abstract_identity_tables);
        ordering::sort_union_views(&mut self.abstract_union_views);
        ordering::sort_indexes(&mut self.indexes);
        ordering::sort_triggers(&mut self.triggers);

        verify::verify(&self)?;

        let set = DerivedRelationalModelSet {
            effective_schema: self.effective_schema,
            dialect: self.dialect,
            project_schemas_in_endpoint_order: self.project_infos.into_values().collect(),
            concrete_resources_in_name_order: self.concrete_resources,
            abstract_identity_tables_in_name_order: self.abstract_identity_tables,
            abstract_union_views_in_name_order: self.abstract_union_views,
            indexes_in_create_order: self.indexes,
            triggers_in_create_order: self.triggers,
        };

        log::debug!(
            "derived relational model: {} resources, {} indexes, {} triggers",
            set.concrete_resources_in_name_order.len(),
            set.indexes_in_create_order.len(),
            set.triggers_in_create_order.len()
        );

        Ok(set)
    }
}
