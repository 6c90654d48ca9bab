use crate::{
    err,
    schema::{
        constraint_naming,
        db::{
            ColumnKind, DbTableName, DescriptorForeignKeyDeduplication, DocumentReferenceBinding,
            ReferentialAction, ResourceStorageKind, TableConstraint,
        },
        JsonPath, QualifiedResourceName, RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Error, Result,
};

use std::collections::BTreeMap;

/// Derives reference and descriptor foreign keys, plus the all-or-none
/// checks tying each reference FK column to its identity parts.
#[derive(Debug)]
pub struct ReferenceConstraint;

/// What a reference FK points at.
struct Target {
    table: DbTableName,
    /// Identity paths in the target's declared order
    identity_paths: Vec<JsonPath>,
    /// Storage column of each identity path
    columns: BTreeMap<JsonPath, String>,
    is_abstract: bool,
    allow_identity_updates: bool,
}

/// Changes to one resource's tables, applied once its bindings are read.
#[derive(Default)]
struct Pending {
    constraints: Vec<(DbTableName, TableConstraint)>,
    deduplications: Vec<(DbTableName, DescriptorForeignKeyDeduplication)>,
}

impl RelationalModelSetPass for ReferenceConstraint {
    fn name(&self) -> &'static str {
        "ReferenceConstraint"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let descriptor_table = DbTableName::new(cx.rules.core_schema_name(), "Descriptor");
        let cascade_allowed = cx.rules.allows_cascading_updates();

        // Reference keys to ensure on concrete targets, applied after every
        // resource so the target order does not matter
        let mut reference_keys: Vec<(QualifiedResourceName, Vec<String>)> = vec![];

        for index in 0..cx.concrete_resources.len() {
            let model = &cx.concrete_resources[index].relational_model;
            if model.storage_kind != ResourceStorageKind::RelationalTables {
                continue;
            }

            let mut pending = Pending::default();

            for binding in &model.document_reference_bindings {
                let target = target_of(cx, &binding.target_resource)?;
                let target_columns =
                    reference_constraints(cx, index, binding, &target, cascade_allowed, &mut pending)?;

                if !target.is_abstract && target_columns.len() > 1 {
                    reference_keys.push((binding.target_resource.clone(), target_columns));
                }
            }

            for table in &model.tables {
                let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for column in &table.columns {
                    if column.kind == ColumnKind::DescriptorFk && column.source_path.is_some() {
                        groups
                            .entry(table.storage_column_name(&column.name).to_string())
                            .or_default()
                            .push(column.name.clone());
                    }
                }

                for (storage_column, mut binding_columns) in groups {
                    let name = constraint_naming::descriptor_fk(&table.table, &storage_column);

                    if binding_columns.len() > 1 {
                        binding_columns.sort();
                        pending.deduplications.push((
                            table.table.clone(),
                            DescriptorForeignKeyDeduplication {
                                storage_column: storage_column.clone(),
                                binding_columns,
                                constraint_name: name.clone(),
                            },
                        ));
                    }

                    pending.constraints.push((
                        table.table.clone(),
                        TableConstraint::ForeignKey {
                            name,
                            columns: vec![storage_column],
                            target_table: descriptor_table.clone(),
                            target_columns: vec!["DocumentId".to_string()],
                            on_delete: ReferentialAction::NoAction,
                            on_update: ReferentialAction::NoAction,
                        },
                    ));
                }
            }

            let model = &mut cx.concrete_resources[index].relational_model;
            for (table_name, constraint) in pending.constraints {
                let Some(table) = model.table_mut(&table_name) else {
                    return Err(err!("table '{table_name}' vanished"));
                };
                table.push_constraint(constraint);
            }
            for (table_name, deduplication) in pending.deduplications {
                if let Some(table) = model.table_mut(&table_name) {
                    table.descriptor_fk_deduplications.push(deduplication);
                }
            }
        }

        for (target, columns) in reference_keys {
            let Some(model) = cx.concrete_resource_mut(&target) else {
                return Err(err!("reference target '{target}' has no model"));
            };
            let model = &mut model.relational_model;
            let root = model.root.clone();
            let Some(table) = model.table_mut(&root) else {
                return Err(err!("root table '{root}' is missing"));
            };

            let covered = table.constraints.iter().any(|constraint| {
                matches!(constraint, TableConstraint::Unique { columns: existing, .. } if *existing == columns)
            });
            if !covered {
                let name = constraint_naming::reference_key(&table.table);
                table.push_constraint(TableConstraint::Unique { name, columns });
            }
        }

        Ok(())
    }
}

/// Queues the all-or-none check and composite FK of one binding. Returns the
/// target columns of the FK.
fn reference_constraints(
    cx: &RelationalModelSetBuilderContext<'_>,
    index: usize,
    binding: &DocumentReferenceBinding,
    target: &Target,
    cascade_allowed: bool,
    pending: &mut Pending,
) -> Result<Vec<String>> {
    let model = &cx.concrete_resources[index].relational_model;
    let resource = &model.resource;

    let Some(table) = model.table(&binding.table) else {
        return Err(Error::invalid_schema(format!(
            "Reference object path '{}' on resource '{resource}' was not bound to a table",
            binding.reference_object_path
        )));
    };

    let Some(reference_base) = binding.fk_column.strip_suffix("_DocumentId") else {
        return Err(err!(
            "reference FK column '{}' does not end with '_DocumentId'",
            binding.fk_column
        ));
    };

    let dependent: Vec<String> = binding
        .identity_bindings
        .iter()
        .map(|identity| identity.column.clone())
        .collect();

    if !dependent.is_empty() {
        pending.constraints.push((
            table.table.clone(),
            TableConstraint::AllOrNoneNullability {
                name: constraint_naming::all_or_none(&table.table, reference_base),
                fk_column: binding.fk_column.clone(),
                dependent_columns: dependent,
            },
        ));
    }

    let mut local_by_identity: BTreeMap<&JsonPath, &str> = BTreeMap::new();
    for identity in &binding.identity_bindings {
        if let Some(existing) =
            local_by_identity.insert(&identity.identity_json_path, identity.column.as_str())
        {
            return Err(Error::invalid_schema(format!(
                "Reference '{}' on resource '{resource}' contains duplicate identity path '{}' \
                 bound to columns '{existing}' and '{}'",
                binding.reference_object_path, identity.identity_json_path, identity.column
            )));
        }
    }

    let missing: Vec<String> = target
        .identity_paths
        .iter()
        .filter(|path| !local_by_identity.contains_key(path))
        .map(|path| format!("'{path}'"))
        .collect();
    if !missing.is_empty() {
        return Err(Error::invalid_schema(format!(
            "Reference '{}' on resource '{resource}' did not include identity path(s) {} \
             required by target '{}'",
            binding.reference_object_path,
            missing.join(", "),
            binding.target_resource
        )));
    }

    // Columns follow the target's identity order so every referencer agrees
    // on one reference key
    let mut columns = vec![binding.fk_column.clone()];
    let mut target_columns = vec!["DocumentId".to_string()];
    let mut target_by_local: BTreeMap<String, String> = BTreeMap::new();

    for path in &target.identity_paths {
        let Some(column) = local_by_identity.get(path) else {
            continue;
        };
        let local = table.storage_column_name(column).to_string();
        let Some(remote) = target.columns.get(path) else {
            return Err(Error::invalid_schema(format!(
                "Reference '{}' on resource '{resource}' did not resolve identity path '{path}' on \
                 target '{}'",
                binding.reference_object_path, binding.target_resource
            )));
        };

        match target_by_local.get(&local) {
            Some(existing) if existing == remote => continue,
            Some(existing) => {
                return Err(Error::invalid_schema(format!(
                    "Reference '{}' on resource '{resource}' maps storage column '{local}' to \
                     multiple target columns ('{existing}', '{remote}')",
                    binding.reference_object_path
                )))
            }
            None => {}
        }

        target_by_local.insert(local.clone(), remote.clone());
        columns.push(local);
        target_columns.push(remote.clone());
    }

    let on_update = if cascade_allowed && (target.is_abstract || target.allow_identity_updates) {
        ReferentialAction::Cascade
    } else {
        ReferentialAction::NoAction
    };

    pending.constraints.push((
        table.table.clone(),
        TableConstraint::ForeignKey {
            name: constraint_naming::reference_fk(&table.table, reference_base),
            columns,
            target_table: target.table.clone(),
            target_columns: target_columns.clone(),
            on_delete: ReferentialAction::NoAction,
            on_update,
        },
    ));

    Ok(target_columns)
}

fn target_of(cx: &RelationalModelSetBuilderContext<'_>, resource: &QualifiedResourceName) -> Result<Target> {
    if let Some(info) = cx
        .abstract_identity_tables
        .iter()
        .find(|info| &info.abstract_resource == resource)
    {
        let columns = info
            .table
            .columns
            .iter()
            .filter_map(|column| {
                column
                    .source_path
                    .clone()
                    .map(|path| (path, column.name.clone()))
            })
            .collect();

        let Some(identity_paths) = cx.schema.identity_json_paths(resource) else {
            return Err(Error::invalid_schema(format!(
                "Reference target resource '{resource}' was not found"
            )));
        };

        return Ok(Target {
            table: info.table.table.clone(),
            identity_paths: identity_paths.to_vec(),
            columns,
            is_abstract: true,
            allow_identity_updates: false,
        });
    }

    let (Some(model), Some(schema)) = (cx.concrete_resource(resource), cx.schema.resource(resource))
    else {
        return Err(Error::invalid_schema(format!(
            "Reference target resource '{resource}' was not found"
        )));
    };

    let Some(root) = model.relational_model.root_table() else {
        return Err(Error::invalid_schema(format!(
            "Reference target resource '{resource}' has no root table"
        )));
    };

    let mut columns = BTreeMap::new();
    for path in &schema.identity_json_paths {
        let Some(column) = root.column_by_source_path(path) else {
            return Err(Error::invalid_schema(format!(
                "Identity path '{path}' on resource '{resource}' did not map to a root table column"
            )));
        };
        columns.insert(path.clone(), root.storage_column_name(&column.name).to_string());
    }

    Ok(Target {
        table: root.table.clone(),
        identity_paths: schema.identity_json_paths.clone(),
        columns,
        is_abstract: false,
        allow_identity_updates: schema.allow_identity_updates,
    })
}
