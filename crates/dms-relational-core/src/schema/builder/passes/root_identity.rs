use crate::{
    schema::{
        constraint_naming,
        db::{RelationalResourceModel, ResourceStorageKind, TableConstraint},
        JsonPath, RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Error, Result,
};

/// Adds the natural-key unique constraint over each root table's identity
/// columns.
#[derive(Debug)]
pub struct RootIdentityConstraint;

impl RelationalModelSetPass for RootIdentityConstraint {
    fn name(&self) -> &'static str {
        "RootIdentityConstraint"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        for model in &mut cx.concrete_resources {
            if model.storage_kind != ResourceStorageKind::RelationalTables {
                continue;
            }

            let Some(identity_paths) = cx.schema.identity_json_paths(model.resource()) else {
                continue;
            };
            if identity_paths.is_empty() {
                continue;
            }

            let model = &mut model.relational_model;
            let columns = natural_key_columns(model, identity_paths)?;

            let root = model.root.clone();
            let Some(table) = model.table_mut(&root) else {
                return Err(crate::err!("root table '{root}' is missing"));
            };

            let name = constraint_naming::natural_key(&table.table);
            table.push_constraint(TableConstraint::Unique { name, columns });
        }

        Ok(())
    }
}

/// Storage columns of the identity paths on the root table, in identity
/// order. Parts of one reference collapse onto its FK column.
pub(super) fn natural_key_columns(
    model: &RelationalResourceModel,
    identity_paths: &[JsonPath],
) -> Result<Vec<String>> {
    let Some(root) = model.root_table() else {
        return Err(crate::err!("resource '{}' has no root table", model.resource));
    };

    let mut columns: Vec<String> = vec![];

    for path in identity_paths {
        let reference_column = model
            .document_reference_bindings
            .iter()
            .filter(|binding| binding.table == root.table)
            .find(|binding| {
                binding
                    .identity_bindings
                    .iter()
                    .any(|identity| &identity.reference_json_path == path)
            })
            .map(|binding| binding.fk_column.clone());

        let column = match reference_column {
            Some(column) => column,
            None => match root.column_by_source_path(path) {
                Some(column) => root.storage_column_name(&column.name).to_string(),
                None => {
                    return Err(Error::invalid_schema(format!(
                        "Identity path '{path}' on resource '{}' does not map to a column on \
                         root table '{}'",
                        model.resource, root.table
                    )))
                }
            },
        };

        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    Ok(columns)
}
