use crate::{
    err,
    schema::{
        db::{
            ConcreteResourceModel, DbTableName, KeyUnificationEqualityConstraintDiagnostics,
            RelationalResourceModel, ResourceStorageKind,
        },
        QualifiedResourceName, RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Error, Result,
};

/// Runs the per-resource pipeline for every concrete resource and registers
/// its model. Descriptors are stored in the shared descriptor table and own
/// no tables.
#[derive(Debug)]
pub struct BaseTraversalAndDescriptorBinding;

impl RelationalModelSetPass for BaseTraversalAndDescriptorBinding {
    fn name(&self) -> &'static str {
        "BaseTraversalAndDescriptorBinding"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let resources: Vec<QualifiedResourceName> = cx
            .schema
            .resources()
            .filter(|(_, schema)| !schema.is_resource_extension)
            .map(|(_, schema)| schema.resource.clone())
            .collect();

        let core_schema = cx.rules.core_schema_name().to_string();

        for resource in resources {
            let Some(resource_key) = cx.schema.resource_keys.get(&resource).cloned() else {
                return Err(Error::invalid_schema(format!(
                    "Effective schema resource key missing for resource '{resource}'"
                )));
            };

            let builder = cx.resource_builder(&resource)?;

            let model = if builder.schema().is_descriptor {
                RelationalResourceModel {
                    resource: resource.clone(),
                    physical_schema: builder.physical_schema.clone(),
                    storage_kind: ResourceStorageKind::SharedDescriptorTable,
                    root: DbTableName::new(&core_schema, "Descriptor"),
                    tables: vec![],
                    document_reference_bindings: vec![],
                    descriptor_edge_sources: vec![],
                    key_unification_equality_constraints:
                        KeyUnificationEqualityConstraintDiagnostics::default(),
                }
            } else {
                let root = builder
                    .root
                    .clone()
                    .ok_or_else(|| err!("resource '{resource}' has no root table"))?;

                RelationalResourceModel {
                    resource: resource.clone(),
                    physical_schema: builder.physical_schema.clone(),
                    storage_kind: ResourceStorageKind::RelationalTables,
                    root,
                    tables: builder.tables.clone(),
                    document_reference_bindings: vec![],
                    descriptor_edge_sources: builder.descriptor_edge_sources.clone(),
                    key_unification_equality_constraints:
                        KeyUnificationEqualityConstraintDiagnostics::default(),
                }
            };

            cx.register_concrete_resource(ConcreteResourceModel {
                resource_key,
                storage_kind: model.storage_kind,
                relational_model: model,
                descriptor_metadata: None,
                extension_sites: vec![],
            })?;
        }

        Ok(())
    }
}
