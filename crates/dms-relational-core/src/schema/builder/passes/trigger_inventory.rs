use super::root_identity::natural_key_columns;
use crate::{
    schema::{
        constraint_naming,
        db::{
            ColumnKind, DbTableModel, DbTriggerInfo, ResourceStorageKind, TriggerKind,
            UnionViewProjection,
        },
        RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Error, Result,
};

/// Lists the triggers maintaining document stamps, referential identities
/// and abstract identity rows.
///
/// Only resources stored in their own tables get triggers; the shared
/// descriptor table is maintained elsewhere.
#[derive(Debug)]
pub struct TriggerInventory;

impl RelationalModelSetPass for TriggerInventory {
    fn name(&self) -> &'static str {
        "TriggerInventory"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let mut triggers = vec![];

        for concrete in &cx.concrete_resources {
            if concrete.storage_kind != ResourceStorageKind::RelationalTables {
                continue;
            }

            let model = &concrete.relational_model;
            let Some(schema) = cx.schema.resource(&model.resource) else {
                return Err(crate::err!("resource '{}' has no schema", model.resource));
            };

            let identity_columns = if schema.identity_json_paths.is_empty() {
                vec![]
            } else {
                natural_key_columns(model, &schema.identity_json_paths)?
            };

            for table in &model.tables {
                let is_root = table.table == model.root;
                triggers.push(DbTriggerInfo {
                    name: constraint_naming::stamp_trigger(&table.table),
                    table: table.table.clone(),
                    kind: TriggerKind::DocumentStamping,
                    key_columns: vec![document_key_column(table)?],
                    identity_projection_columns: if is_root {
                        identity_columns.clone()
                    } else {
                        vec![]
                    },
                });
            }

            let Some(root) = model.root_table() else {
                return Err(crate::err!("resource '{}' has no root table", model.resource));
            };
            let document_key = document_key_column(root)?;

            if !identity_columns.is_empty() {
                triggers.push(DbTriggerInfo {
                    name: constraint_naming::referential_identity_trigger(&root.table),
                    table: root.table.clone(),
                    kind: TriggerKind::ReferentialIdentityMaintenance,
                    key_columns: vec![document_key.clone()],
                    identity_projection_columns: identity_columns.clone(),
                });
            }

            let Some(superclass) = &schema.superclass else {
                continue;
            };
            let Some(identity_table) = cx
                .abstract_identity_tables
                .iter()
                .find(|info| &info.abstract_resource == superclass)
            else {
                return Err(Error::invalid_schema(format!(
                    "Subclass resource '{}' names superclass '{superclass}' without an identity \
                     table",
                    model.resource
                )));
            };

            // The member's arm of the union view lists the root columns feeding
            // the identity table, in identity table order
            let projection = cx
                .abstract_union_views
                .iter()
                .filter(|view| &view.abstract_resource == superclass)
                .flat_map(|view| &view.arms)
                .find(|arm| arm.concrete_resource == model.resource)
                .map(|arm| {
                    arm.projections
                        .iter()
                        .skip(1)
                        .filter_map(|projection| match projection {
                            UnionViewProjection::Column(column) => Some(column.clone()),
                            UnionViewProjection::Literal(_) => None,
                        })
                        .collect()
                })
                .unwrap_or_else(|| identity_columns.clone());

            triggers.push(DbTriggerInfo {
                name: constraint_naming::abstract_identity_trigger(&root.table),
                table: root.table.clone(),
                kind: TriggerKind::AbstractIdentityMaintenance {
                    target_table: identity_table.table.table.clone(),
                },
                key_columns: vec![document_key],
                identity_projection_columns: projection,
            });
        }

        log::debug!("trigger inventory: {} triggers", triggers.len());
        cx.triggers.extend(triggers);
        Ok(())
    }
}

/// The key column carrying the owning document's id.
fn document_key_column(table: &DbTableModel) -> Result<String> {
    table
        .key_columns
        .iter()
        .find(|key| key.kind == ColumnKind::ParentKeyPart && key.name.ends_with("DocumentId"))
        .map(|key| key.name.clone())
        .ok_or_else(|| {
            Error::invalid_schema(format!(
                "Document stamping requires a DocumentId key column, but none was found on table \
                 '{}'",
                table.table
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        db::{DbKeyColumn, DbTableName},
        JsonPath,
    };

    #[test]
    fn child_tables_stamp_through_the_root_document() {
        let mut table = DbTableModel::new(
            DbTableName::new("edfi", "StudentAddress"),
            JsonPath::compile("$.addresses[*]").unwrap(),
        );
        table.key_columns = vec![
            DbKeyColumn {
                name: "Student_DocumentId".to_string(),
                kind: ColumnKind::ParentKeyPart,
            },
            DbKeyColumn {
                name: "Ordinal".to_string(),
                kind: ColumnKind::Ordinal,
            },
        ];

        assert_eq!(document_key_column(&table).unwrap(), "Student_DocumentId");

        table.key_columns.remove(0);
        assert!(document_key_column(&table).unwrap_err().is_invalid_schema());
    }
}
