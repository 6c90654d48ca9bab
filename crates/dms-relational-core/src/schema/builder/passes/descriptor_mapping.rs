use crate::{
    schema::{
        db::{DbTableName, DescriptorEdgeSource, DescriptorMetadata, ResourceStorageKind},
        NormalizedSchemaSet, QualifiedResourceName, RelationalModelSetBuilderContext,
        RelationalModelSetPass,
    },
    Error, Result,
};

/// Column contract of the shared descriptor table.
const DESCRIPTOR_COLUMNS: [&str; 7] = [
    "Namespace",
    "CodeValue",
    "ShortDescription",
    "Description",
    "EffectiveBeginDate",
    "EffectiveEndDate",
    "Discriminator",
];

/// Checks every descriptor edge targets a descriptor resource and attaches
/// the shared-table metadata to descriptor resources.
#[derive(Debug)]
pub struct DescriptorResourceMapping;

impl RelationalModelSetPass for DescriptorResourceMapping {
    fn name(&self) -> &'static str {
        "DescriptorResourceMapping"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        for model in &cx.concrete_resources {
            for edge in &model.relational_model.descriptor_edge_sources {
                ensure_descriptor_target(&cx.schema, model.resource(), edge)?;
            }
        }

        let table = DbTableName::new(cx.rules.core_schema_name(), "Descriptor");

        for model in &mut cx.concrete_resources {
            if model.storage_kind != ResourceStorageKind::SharedDescriptorTable {
                continue;
            }

            model.descriptor_metadata = Some(DescriptorMetadata {
                table: table.clone(),
                columns: DESCRIPTOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
                discriminator: model.resource().to_string(),
            });
        }

        Ok(())
    }
}

pub(super) fn ensure_descriptor_target(
    schema: &NormalizedSchemaSet,
    resource: &QualifiedResourceName,
    edge: &DescriptorEdgeSource,
) -> Result<()> {
    let is_descriptor = schema
        .resource(&edge.descriptor_resource)
        .is_some_and(|target| target.is_descriptor);

    if !is_descriptor {
        return Err(Error::invalid_schema(format!(
            "Descriptor path '{}' on resource '{resource}' targets '{}', which is not a \
             descriptor resource",
            edge.descriptor_value_path, edge.descriptor_resource
        )));
    }

    Ok(())
}
