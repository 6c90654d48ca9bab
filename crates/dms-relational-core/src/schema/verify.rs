use super::{NameScope, RelationalModelSetBuilderContext};
use crate::{Error, Result};

use std::collections::HashSet;

struct Verify<'a, 'b> {
    cx: &'a RelationalModelSetBuilderContext<'b>,
}

/// Checks the accumulated state before the final model is handed out.
pub(crate) fn verify(cx: &RelationalModelSetBuilderContext<'_>) -> Result<()> {
    Verify { cx }.verify()
}

impl Verify<'_, '_> {
    fn verify(&self) -> Result<()> {
        self.verify_names_are_present()?;
        self.verify_resources_are_unique()?;
        self.verify_index_names_are_unique()?;
        self.verify_trigger_names_are_unique()?;
        self.verify_name_overrides_are_used()?;
        self.verify_no_identifier_collisions()?;
        Ok(())
    }

    fn verify_names_are_present(&self) -> Result<()> {
        for table in self.cx.tables() {
            if table.table.schema.is_empty() || table.table.name.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "Derived table '{}' has an empty schema or name",
                    table.table
                )));
            }

            if let Some(column) = table.columns.iter().find(|column| column.name.is_empty()) {
                return Err(Error::invalid_schema(format!(
                    "Table '{}' has a column with an empty name (source path '{}')",
                    table.table,
                    column.source_path.clone().unwrap_or_default()
                )));
            }

            if table
                .constraints
                .iter()
                .any(|constraint| constraint.name().is_empty())
            {
                return Err(Error::invalid_schema(format!(
                    "Table '{}' has a constraint with an empty name",
                    table.table
                )));
            }
        }

        for index in &self.cx.indexes {
            if index.name.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "Index on '{}' has an empty name",
                    index.table
                )));
            }
        }

        for trigger in &self.cx.triggers {
            if trigger.name.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "Trigger on '{}' has an empty name",
                    trigger.table
                )));
            }
        }

        Ok(())
    }

    fn verify_resources_are_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for model in &self.cx.concrete_resources {
            if !seen.insert(model.resource()) {
                return Err(Error::uniqueness_violation(format!(
                    "Concrete resource '{}' appears more than once",
                    model.resource()
                )));
            }
        }

        Ok(())
    }

    fn verify_index_names_are_unique(&self) -> Result<()> {
        let scope = self.cx.rules.index_name_scope();
        let mut seen = HashSet::new();

        for index in &self.cx.indexes {
            let key = match scope {
                NameScope::Schema => (index.table.schema.as_str(), None, index.name.as_str()),
                NameScope::Table => (
                    index.table.schema.as_str(),
                    Some(index.table.name.as_str()),
                    index.name.as_str(),
                ),
            };

            if !seen.insert(key) {
                return Err(Error::uniqueness_violation(format!(
                    "duplicate index name '{}' on '{}'",
                    index.name, index.table
                )));
            }
        }

        Ok(())
    }

    fn verify_trigger_names_are_unique(&self) -> Result<()> {
        let scope = self.cx.rules.trigger_name_scope();
        let mut seen = HashSet::new();

        for trigger in &self.cx.triggers {
            let key = match scope {
                NameScope::Schema => (trigger.table.schema.as_str(), None, trigger.name.as_str()),
                NameScope::Table => (
                    trigger.table.schema.as_str(),
                    Some(trigger.table.name.as_str()),
                    trigger.name.as_str(),
                ),
            };

            if !seen.insert(key) {
                return Err(Error::uniqueness_violation(format!(
                    "duplicate trigger name '{}' on '{}'",
                    trigger.name, trigger.table
                )));
            }
        }

        Ok(())
    }

    fn verify_name_overrides_are_used(&self) -> Result<()> {
        let mut builders: Vec<_> = self.cx.resource_builders.iter().collect();
        builders.sort_by(|a, b| a.0.cmp(b.0));

        for (resource, builder) in builders {
            let unused = builder.name_overrides.unused();
            if !unused.is_empty() {
                return Err(Error::unused_name_overrides(resource.clone(), unused));
            }
        }

        Ok(())
    }

    fn verify_no_identifier_collisions(&self) -> Result<()> {
        let collisions = self.cx.collision_detector.collisions();
        if collisions.is_empty() {
            return Ok(());
        }

        Err(Error::identifier_collisions(collisions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::{
            db::{DbIndexInfo, DbTableName, DbTriggerInfo, IndexKind, TriggerKind},
            MssqlDialectRules, PgsqlDialectRules, SqlDialect, SqlDialectRules,
        },
        EffectiveSchemaSet,
    };

    fn index(table: &DbTableName, name: &str) -> DbIndexInfo {
        DbIndexInfo {
            name: name.to_string(),
            table: table.clone(),
            columns: vec!["SchoolId".to_string()],
            kind: IndexKind::ForeignKeySupport,
            is_unique: false,
        }
    }

    fn trigger(table: &DbTableName, name: &str) -> DbTriggerInfo {
        DbTriggerInfo {
            name: name.to_string(),
            table: table.clone(),
            kind: TriggerKind::DocumentStamping,
            key_columns: vec!["DocumentId".to_string()],
            identity_projection_columns: vec![],
        }
    }

    fn check(
        dialect: SqlDialect,
        rules: &dyn SqlDialectRules,
        indexes: Vec<DbIndexInfo>,
        triggers: Vec<DbTriggerInfo>,
    ) -> Result<()> {
        let effective = EffectiveSchemaSet::from_projects(vec![]);
        let mut cx = RelationalModelSetBuilderContext::new(&effective, dialect, rules)?;
        cx.indexes = indexes;
        cx.triggers = triggers;
        verify(&cx)
    }

    fn session() -> DbTableName {
        DbTableName::new("edfi", "Session")
    }

    fn section() -> DbTableName {
        DbTableName::new("edfi", "Section")
    }

    #[test]
    fn pgsql_index_names_are_schema_scoped() {
        let indexes = vec![index(&session(), "IX_School"), index(&section(), "IX_School")];

        let err = check(SqlDialect::Pgsql, &PgsqlDialectRules, indexes, vec![]).unwrap_err();
        assert!(err.is_uniqueness_violation());
        assert_eq!(
            err.to_string(),
            "uniqueness violation: duplicate index name 'IX_School' on 'edfi.Section'"
        );
    }

    #[test]
    fn mssql_index_names_are_table_scoped() {
        let indexes = vec![index(&session(), "IX_School"), index(&section(), "IX_School")];
        assert!(check(SqlDialect::Mssql, &MssqlDialectRules, indexes, vec![]).is_ok());

        let indexes = vec![index(&session(), "IX_School"), index(&session(), "IX_School")];
        let err = check(SqlDialect::Mssql, &MssqlDialectRules, indexes, vec![]).unwrap_err();
        assert!(err.is_uniqueness_violation());
    }

    #[test]
    fn pgsql_trigger_names_are_table_scoped() {
        let triggers = vec![trigger(&session(), "TR_Stamp"), trigger(&section(), "TR_Stamp")];
        assert!(check(SqlDialect::Pgsql, &PgsqlDialectRules, vec![], triggers).is_ok());

        let triggers = vec![trigger(&session(), "TR_Stamp"), trigger(&session(), "TR_Stamp")];
        let err = check(SqlDialect::Pgsql, &PgsqlDialectRules, vec![], triggers).unwrap_err();
        assert!(err.is_uniqueness_violation());
        assert_eq!(
            err.to_string(),
            "uniqueness violation: duplicate trigger name 'TR_Stamp' on 'edfi.Session'"
        );
    }

    #[test]
    fn mssql_trigger_names_are_schema_scoped() {
        let triggers = vec![trigger(&session(), "TR_Stamp"), trigger(&section(), "TR_Stamp")];

        let err = check(SqlDialect::Mssql, &MssqlDialectRules, vec![], triggers).unwrap_err();
        assert!(err.is_uniqueness_violation());
        assert_eq!(
            err.to_string(),
            "uniqueness violation: duplicate trigger name 'TR_Stamp' on 'edfi.Section'"
        );
    }

    #[test]
    fn same_name_in_different_schemas_is_allowed() {
        let other = DbTableName::new("sample", "Section");
        let triggers = vec![trigger(&session(), "TR_Stamp"), trigger(&other, "TR_Stamp")];
        let indexes = vec![index(&session(), "IX_School"), index(&other, "IX_School")];

        assert!(check(SqlDialect::Mssql, &MssqlDialectRules, indexes, triggers).is_ok());
    }
}
