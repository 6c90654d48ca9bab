use super::extension_tables::base_resource_of;
use crate::{
    err,
    schema::{
        constraint_naming,
        db::{DbTableModel, RelationalResourceModel, ResourceStorageKind, TableConstraint},
        input::ArrayUniquenessConstraintInput,
        JsonPath, JsonPathSegment, QualifiedResourceName, RelationalModelSetBuilderContext,
        RelationalModelSetPass,
    },
    Error, Result,
};

use std::collections::BTreeMap;

/// Turns declared array uniqueness constraints into unique constraints on
/// the collection tables they describe.
#[derive(Debug)]
pub struct ArrayUniquenessConstraint;

impl RelationalModelSetPass for ArrayUniquenessConstraint {
    fn name(&self) -> &'static str {
        "ArrayUniquenessConstraint"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        // Declaring resource and the model its constraints land on
        let mut declarations: Vec<(QualifiedResourceName, QualifiedResourceName)> = vec![];

        let resources: Vec<(QualifiedResourceName, bool)> = cx
            .schema
            .resources()
            .filter(|(_, schema)| !schema.is_descriptor)
            .map(|(_, schema)| (schema.resource.clone(), schema.is_resource_extension))
            .collect();

        for (resource, is_extension) in resources {
            let target = if is_extension {
                base_resource_of(cx, &resource)?
            } else {
                resource.clone()
            };
            declarations.push((resource, target));
        }

        for (declaring, target) in declarations {
            let constraints = cx.resource_builder(&declaring)?.array_uniqueness_constraints.clone();
            if constraints.is_empty() {
                continue;
            }

            let Some(model) = cx.concrete_resource_mut(&target) else {
                return Err(err!("resource '{target}' is not registered"));
            };
            if model.storage_kind != ResourceStorageKind::RelationalTables {
                continue;
            }
            let model = &mut model.relational_model;

            for constraint in &constraints {
                apply(model, constraint)?;
            }

            log::trace!(
                "resource {target}: {} array uniqueness constraints from {declaring}",
                constraints.len()
            );
        }

        Ok(())
    }
}

fn apply(model: &mut RelationalResourceModel, constraint: &ArrayUniquenessConstraintInput) -> Result<()> {
    let paths: Vec<JsonPath> = constraint
        .paths
        .iter()
        .map(|path| match &constraint.base_path {
            Some(base) => base.join(path),
            None => path.clone(),
        })
        .collect();

    // Paths are grouped by the array they sit in; each array gets its own
    // constraint
    let mut by_scope: BTreeMap<JsonPath, Vec<JsonPath>> = BTreeMap::new();
    for path in paths {
        let scope = array_scope(&path).ok_or_else(|| {
            Error::invalid_schema(format!(
                "arrayUniquenessConstraints path '{path}' on resource '{}' must include an array \
                 wildcard segment",
                model.resource
            ))
        })?;
        by_scope.entry(scope).or_default().push(path);
    }

    for (scope, paths) in by_scope {
        let (index, paths) = match model.tables.iter().position(|table| table.scope == scope) {
            Some(index) => (index, paths),
            None => match strip_extension_root(&scope).and_then(|aligned| {
                model
                    .tables
                    .iter()
                    .position(|table| table.scope == aligned)
            }) {
                Some(index) => (
                    index,
                    paths
                        .iter()
                        .map(|path| strip_extension_root(path).unwrap_or_else(|| path.clone()))
                        .collect(),
                ),
                None => {
                    return Err(Error::invalid_schema(format!(
                        "arrayUniquenessConstraints scope '{scope}' on resource '{}' did not map \
                         to a child table",
                        model.resource
                    )))
                }
            },
        };

        let table = &model.tables[index];
        let mut columns = table.parent_key_column_names();
        let mut resolved = vec![];

        for path in &paths {
            let column = resolve_column(model, table, path)?;
            if !columns.contains(&column) {
                columns.push(column.clone());
            }
            if !resolved.contains(&column) {
                resolved.push(column);
            }
        }

        let name = constraint_naming::unique(&table.table, &resolved);
        let table = &mut model.tables[index];

        let covered = table.constraints.iter().any(|existing| {
            matches!(existing, TableConstraint::Unique { columns: c, .. } if *c == columns)
        });
        if !covered {
            table.push_constraint(TableConstraint::Unique { name, columns });
        }
    }

    for nested in &constraint.nested {
        apply(model, nested)?;
    }

    Ok(())
}

/// Column holding the value at `path` on `table`. Reference identity parts
/// resolve to the reference FK column.
fn resolve_column(model: &RelationalResourceModel, table: &DbTableModel, path: &JsonPath) -> Result<String> {
    let binding = model.document_reference_bindings.iter().find(|binding| {
        binding
            .identity_bindings
            .iter()
            .any(|identity| &identity.reference_json_path == path)
    });

    if let Some(binding) = binding {
        if binding.table != table.table {
            return Err(Error::invalid_schema(format!(
                "arrayUniquenessConstraints path '{path}' on resource '{}' did not bind to the \
                 owning table scope",
                model.resource
            )));
        }
        return Ok(binding.fk_column.clone());
    }

    match table.column_by_source_path(path) {
        Some(column) => Ok(table.storage_column_name(&column.name).to_string()),
        None => Err(Error::invalid_schema(format!(
            "arrayUniquenessConstraints path '{path}' on resource '{}' did not map to a column on \
             table '{}'",
            model.resource, table.table.name
        ))),
    }
}

/// The prefix of `path` through its last `[*]`.
fn array_scope(path: &JsonPath) -> Option<JsonPath> {
    let last = path
        .segments()
        .iter()
        .rposition(|segment| *segment == JsonPathSegment::AnyArrayElement)?;
    Some(JsonPath::from_segments(path.segments()[..=last].to_vec()))
}

/// `path` without a leading `._ext.{project}`.
fn strip_extension_root(path: &JsonPath) -> Option<JsonPath> {
    match path.segments() {
        [JsonPathSegment::Property(ext), JsonPathSegment::Property(_), rest @ ..] if ext == "_ext" => {
            Some(JsonPath::from_segments(rest.to_vec()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(src: &str) -> JsonPath {
        JsonPath::compile(src).unwrap()
    }

    #[test]
    fn scope_ends_at_last_wildcard() {
        assert_eq!(
            array_scope(&path("$.addresses[*].periods[*].beginDate")),
            Some(path("$.addresses[*].periods[*]"))
        );
        assert_eq!(array_scope(&path("$.name")), None);
    }

    #[test]
    fn extension_root_is_stripped() {
        assert_eq!(
            strip_extension_root(&path("$._ext.sample.addresses[*]")),
            Some(path("$.addresses[*]"))
        );
        assert_eq!(strip_extension_root(&path("$.addresses[*]")), None);
    }
}
