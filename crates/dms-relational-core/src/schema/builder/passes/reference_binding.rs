use super::{extension_tables::base_resource_of, key_unification};
use crate::{
    schema::{
        builder::traversal::{push_unique_column, schema_node_at},
        db::{
            owning_table_index, ColumnKind, DbColumnModel, DescriptorEdgeSource,
            DocumentReferenceBinding, ReferenceIdentityBinding, RelationalResourceModel,
            RelationalScalarType, ResourceStorageKind,
        },
        input::{
            parse_decimal_infos, DecimalInfo, DocumentReferenceMapping, EqualityConstraintInput,
            ResourceSchema,
        },
        name::{
            descriptor_id_column_name, document_id_column_name, property_base_name,
            to_pascal_case,
        },
        scalar_type, DescriptorPathMap, JsonPath, NameOverrideKind, NameOverrides,
        QualifiedResourceName, RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    err, Error, Result,
};

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Binds every document reference to an FK column and identity-part columns,
/// then applies key unification from the declared equality constraints.
#[derive(Debug)]
pub struct ReferenceBinding;

/// A reference mapping with every name and type it needs resolved against
/// the builder that declared it.
struct ResolvedReference {
    mapping: DocumentReferenceMapping,
    reference_base: String,
    parts: Vec<ResolvedPart>,
}

struct ResolvedPart {
    identity_json_path: JsonPath,
    reference_json_path: JsonPath,
    column: DbColumnModel,
    descriptor: Option<QualifiedResourceName>,
}

impl RelationalModelSetPass for ReferenceBinding {
    fn name(&self) -> &'static str {
        "ReferenceBinding"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let mut extensions_by_base: BTreeMap<QualifiedResourceName, Vec<QualifiedResourceName>> =
            BTreeMap::new();
        let extensions: Vec<QualifiedResourceName> = cx
            .schema
            .resources()
            .filter(|(project, schema)| {
                project.info.is_extension_project && schema.is_resource_extension
            })
            .map(|(_, schema)| schema.resource.clone())
            .collect();
        for extension in extensions {
            let base = base_resource_of(cx, &extension)?;
            extensions_by_base.entry(base).or_default().push(extension);
        }

        let resources: Vec<QualifiedResourceName> = cx
            .concrete_resources
            .iter()
            .filter(|model| model.storage_kind == ResourceStorageKind::RelationalTables)
            .map(|model| model.resource().clone())
            .collect();

        for resource in resources {
            let mut declaring = vec![resource.clone()];
            declaring.extend(extensions_by_base.remove(&resource).unwrap_or_default());

            let mut resolved = vec![];
            let mut equality_constraints: Vec<EqualityConstraintInput> = vec![];

            for owner in &declaring {
                let builder = cx.resource_builder(owner)?.clone();
                equality_constraints.extend(builder.equality_constraints.iter().cloned());

                let mut overrides = builder.name_overrides.clone();
                for mapping in &builder.document_references {
                    resolved.push(resolve_reference(
                        cx,
                        owner,
                        mapping,
                        &builder.descriptor_paths,
                        &builder.json_schema_for_insert,
                        &builder.decimal_infos,
                        &mut overrides,
                    )?);
                }
                cx.resource_builder(owner)?.name_overrides = overrides;
            }

            let Some(model) = cx.concrete_resource_mut(&resource) else {
                return Err(err!("resource '{resource}' is not registered"));
            };
            let model = &mut model.relational_model;

            for reference in resolved {
                bind(model, reference)?;
            }

            key_unification::apply(model, &equality_constraints)?;

            log::trace!(
                "resource {resource}: {} reference bindings",
                model.document_reference_bindings.len()
            );
        }

        Ok(())
    }
}

fn resolve_reference(
    cx: &RelationalModelSetBuilderContext<'_>,
    owner: &QualifiedResourceName,
    mapping: &DocumentReferenceMapping,
    descriptor_paths: &DescriptorPathMap,
    json_schema: &Value,
    decimal_infos: &BTreeMap<JsonPath, DecimalInfo>,
    overrides: &mut NameOverrides,
) -> Result<ResolvedReference> {
    let reference_base = overrides
        .take(&mapping.reference_object_path, NameOverrideKind::Column)
        .unwrap_or_else(|| to_pascal_case(&mapping.mapping_key));

    let mut parts = vec![];

    for binding in &mapping.reference_json_paths {
        let path = &binding.reference_json_path;
        let part = overrides
            .take(path, NameOverrideKind::Column)
            .unwrap_or_else(|| {
                let relative = path
                    .strip_prefix(&mapping.reference_object_path)
                    .unwrap_or_default();
                property_base_name(relative)
            });
        let name = format!("{reference_base}_{part}");

        let (column, descriptor) = match descriptor_paths.get(path) {
            Some(info) => (
                DbColumnModel::new(
                    descriptor_id_column_name(&name),
                    ColumnKind::DescriptorFk,
                    RelationalScalarType::int64(),
                )
                .target_resource(info.descriptor_resource.clone()),
                Some(info.descriptor_resource.clone()),
            ),
            None => {
                let ty = reference_part_type(
                    cx,
                    owner,
                    mapping,
                    path,
                    &binding.identity_json_path,
                    json_schema,
                    decimal_infos,
                )?;
                (DbColumnModel::new(name, ColumnKind::Scalar, ty), None)
            }
        };

        parts.push(ResolvedPart {
            identity_json_path: binding.identity_json_path.clone(),
            reference_json_path: path.clone(),
            column: column.nullable(!mapping.is_required).source_path(path.clone()),
            descriptor,
        });
    }

    Ok(ResolvedReference {
        mapping: mapping.clone(),
        reference_base,
        parts,
    })
}

/// Type of one identity part: from the referencing schema when it declares
/// the path, otherwise from the target's own identity property.
fn reference_part_type(
    cx: &RelationalModelSetBuilderContext<'_>,
    owner: &QualifiedResourceName,
    mapping: &DocumentReferenceMapping,
    reference_path: &JsonPath,
    identity_path: &JsonPath,
    json_schema: &Value,
    decimal_infos: &BTreeMap<JsonPath, DecimalInfo>,
) -> Result<RelationalScalarType> {
    if let Some(node) = schema_node_at(json_schema, reference_path).and_then(Value::as_object) {
        return scalar_type::resolve(node, reference_path, decimal_infos);
    }

    // Abstract targets have no schema of their own; any member will do
    let targets: Vec<&ResourceSchema> = match cx.schema.resource(&mapping.target) {
        Some(target) => vec![target],
        None => cx
            .schema
            .resources()
            .map(|(_, schema)| schema)
            .filter(|schema| schema.superclass.as_ref() == Some(&mapping.target))
            .collect(),
    };

    for target in targets {
        let member_path = match &target.superclass_identity_json_path {
            Some(mapped)
                if mapped == identity_path
                    && target.superclass.as_ref() == Some(&mapping.target) =>
            {
                match target.identity_json_paths.first() {
                    Some(path) => path,
                    None => continue,
                }
            }
            _ => identity_path,
        };

        let node: Option<&Map<String, Value>> = target
            .raw
            .get("jsonSchemaForInsert")
            .and_then(|schema| schema_node_at(schema, member_path))
            .and_then(Value::as_object);

        if let Some(node) = node {
            let decimals = parse_decimal_infos(target)?;
            return scalar_type::resolve(node, member_path, &decimals);
        }
    }

    Err(Error::invalid_schema(format!(
        "Cannot resolve the type of reference path '{reference_path}' on resource '{owner}': \
         neither the resource nor '{}' declares it",
        mapping.target
    )))
}

fn bind(
    model: &mut RelationalResourceModel,
    reference: ResolvedReference,
) -> Result<()> {
    let mapping = &reference.mapping;

    let Some(index) = owning_table_index(&model.tables, &mapping.reference_object_path) else {
        return Err(Error::invalid_schema(format!(
            "No table owns reference object '{}' on resource '{}'",
            mapping.reference_object_path, model.resource
        )));
    };

    let fk_column = document_id_column_name(&reference.reference_base);
    let table = &mut model.tables[index];

    push_unique_column(
        table,
        DbColumnModel::new(&fk_column, ColumnKind::DocumentFk, RelationalScalarType::int64())
            .nullable(!mapping.is_required)
            .source_path(mapping.reference_object_path.clone())
            .target_resource(mapping.target.clone()),
    )?;

    let mut identity_bindings = vec![];

    for part in reference.parts {
        let column_name = part.column.name.clone();
        push_unique_column(table, part.column)?;

        if let Some(descriptor_resource) = part.descriptor {
            model.descriptor_edge_sources.push(DescriptorEdgeSource {
                is_identity_component: mapping.is_identity_component,
                descriptor_value_path: part.reference_json_path.clone(),
                table: table.table.clone(),
                fk_column: column_name.clone(),
                descriptor_resource,
            });
        }

        identity_bindings.push(ReferenceIdentityBinding {
            identity_json_path: part.identity_json_path,
            reference_json_path: part.reference_json_path,
            column: column_name,
        });
    }

    model.document_reference_bindings.push(DocumentReferenceBinding {
        is_identity_component: mapping.is_identity_component,
        reference_object_path: mapping.reference_object_path.clone(),
        table: table.table.clone(),
        fk_column,
        target_resource: mapping.target.clone(),
        identity_bindings,
    });

    Ok(())
}
