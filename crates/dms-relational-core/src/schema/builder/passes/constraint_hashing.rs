use crate::{
    schema::{
        db::{DbTableModel, TableConstraint},
        dialect::fit_identifier,
        hash::hash8,
        RelationalModelSetBuilderContext, RelationalModelSetPass, SqlDialect,
    },
    Result,
};

use std::collections::{BTreeMap, BTreeSet};

/// Makes constraint names unique per schema and fits them within the
/// dialect's identifier limit.
///
/// Constraints sharing a name with differing signatures each get a suffix
/// hashed from their own signature; over-long names keep a prefix and end in
/// the signature hash. Both outcomes depend only on the constraint itself.
#[derive(Debug)]
pub struct ConstraintDialectHashing;

impl RelationalModelSetPass for ConstraintDialectHashing {
    fn name(&self) -> &'static str {
        "ConstraintDialectHashing"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let max = cx.rules.max_identifier_length();
        let dialect = cx.rules.dialect();

        let mut signatures: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
        for table in cx.tables() {
            for constraint in &table.constraints {
                signatures
                    .entry((table.table.schema.clone(), constraint.name().to_string()))
                    .or_default()
                    .insert(constraint.signature(&table.table));
            }
        }

        let conflicting: BTreeSet<(String, String)> = signatures
            .into_iter()
            .filter(|(_, set)| set.len() > 1)
            .map(|(key, _)| key)
            .collect();

        let mut renamed = 0;
        for table in cx.tables_mut() {
            renamed += rename_constraints(table, &conflicting, dialect, max);
        }

        if renamed > 0 {
            log::debug!("constraint hashing renamed {renamed} constraints");
        }

        Ok(())
    }
}

fn rename_constraints(
    table: &mut DbTableModel,
    conflicting: &BTreeSet<(String, String)>,
    dialect: SqlDialect,
    max: usize,
) -> usize {
    let mut renames = vec![];

    for constraint in &mut table.constraints {
        let original = constraint.name().to_string();
        let signature = constraint.signature(&table.table);

        let mut name = original.clone();
        if conflicting.contains(&(table.table.schema.clone(), original.clone())) {
            name = format!("{original}_{}", hash8(&signature));
        }
        let name = fit_identifier(dialect, &name, &signature, max);

        if name != original {
            log::trace!("constraint {original} on {} renamed to {name}", table.table);

            let storage_column = match constraint {
                TableConstraint::ForeignKey { columns, .. } if columns.len() == 1 => {
                    Some(columns[0].clone())
                }
                _ => None,
            };
            *constraint.name_mut() = name.clone();
            renames.push((original, storage_column, name));
        }
    }

    for (original, storage_column, name) in &renames {
        for deduplication in &mut table.descriptor_fk_deduplications {
            if &deduplication.constraint_name == original
                && Some(&deduplication.storage_column) == storage_column.as_ref()
            {
                deduplication.constraint_name = name.clone();
            }
        }
    }

    renames.len()
}
