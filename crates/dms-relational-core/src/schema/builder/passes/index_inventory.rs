use crate::{
    schema::{
        constraint_naming,
        db::{DbIndexInfo, DbTableModel, IndexKind, TableConstraint},
        RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Result,
};

/// Lists the indexes every derived table needs: its primary key, one per
/// unique constraint, and FK-support indexes.
#[derive(Debug)]
pub struct IndexInventory;

impl RelationalModelSetPass for IndexInventory {
    fn name(&self) -> &'static str {
        "IndexInventory"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let mut indexes = vec![];
        for table in cx.tables() {
            table_indexes(table, &mut indexes);
        }

        log::debug!("index inventory: {} indexes", indexes.len());
        cx.indexes.extend(indexes);
        Ok(())
    }
}

fn table_indexes(table: &DbTableModel, out: &mut Vec<DbIndexInfo>) {
    let primary_key = table.key_column_names();
    let mut covering: Vec<Vec<String>> = vec![];

    let push = |out: &mut Vec<DbIndexInfo>, index: DbIndexInfo| {
        if !out
            .iter()
            .any(|existing| existing.table == index.table && existing.name == index.name)
        {
            out.push(index);
        }
    };

    if !primary_key.is_empty() {
        push(
            out,
            DbIndexInfo {
                name: constraint_naming::primary_key(&table.table),
                table: table.table.clone(),
                columns: primary_key.clone(),
                kind: IndexKind::PrimaryKey,
                is_unique: true,
            },
        );
        covering.push(primary_key);
    }

    for constraint in &table.constraints {
        if let TableConstraint::Unique { name, columns } = constraint {
            push(
                out,
                DbIndexInfo {
                    name: name.clone(),
                    table: table.table.clone(),
                    columns: columns.clone(),
                    kind: IndexKind::UniqueConstraint,
                    is_unique: true,
                },
            );
            covering.push(columns.clone());
        }
    }

    for constraint in &table.constraints {
        let TableConstraint::ForeignKey { columns, .. } = constraint else {
            continue;
        };

        if covering.iter().any(|index| is_leading_prefix(columns, index)) {
            continue;
        }

        push(
            out,
            DbIndexInfo {
                name: constraint_naming::fk_support_index(&table.table, columns),
                table: table.table.clone(),
                columns: columns.clone(),
                kind: IndexKind::ForeignKeySupport,
                is_unique: false,
            },
        );
        covering.push(columns.clone());
    }
}

/// Whether `columns` are the first columns of `index`, in order.
fn is_leading_prefix(columns: &[String], index: &[String]) -> bool {
    columns.len() <= index.len() && index[..columns.len()] == *columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        db::{ColumnKind, DbKeyColumn, DbTableName, ReferentialAction},
        JsonPath,
    };

    fn fk(name: &str, columns: &[&str]) -> TableConstraint {
        TableConstraint::ForeignKey {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            target_table: DbTableName::new("edfi", "School"),
            target_columns: vec!["DocumentId".to_string()],
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    #[test]
    fn fk_covered_by_key_prefix_gets_no_index() {
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
        table.push_constraint(fk("FK_StudentAddress_Student", &["Student_DocumentId"]));
        table.push_constraint(fk("FK_StudentAddress_School", &["School_DocumentId", "SchoolId"]));

        let mut out = vec![];
        table_indexes(&table, &mut out);

        let names: Vec<&str> = out.iter().map(|index| index.name.as_str()).collect();
        assert_eq!(
            names,
            ["PK_StudentAddress", "IX_StudentAddress_SchoolId_School_DocumentId"]
        );
        assert!(!out[1].is_unique);
    }

    #[test]
    fn prefix_must_lead() {
        let index = vec!["A".to_string(), "B".to_string()];
        assert!(is_leading_prefix(&["A".to_string()], &index));
        assert!(!is_leading_prefix(&["B".to_string()], &index));
    }
}
