use crate::{
    schema::{
        db::{
            AbstractUnionViewInfo, ColumnBinding, ColumnStorage, ConcreteResourceModel,
            DbIndexInfo, DbTableModel, DbTableName, DbTriggerInfo, TableConstraint, TriggerKind,
            UnionViewProjection,
        },
        IdentifierScope, NameScope, OverrideCollisionDetector, RelationalModelSetBuilderContext,
        RelationalModelSetPass, SqlDialectRules,
    },
    Result,
};

/// Rewrites every derived identifier to fit the dialect's limit.
///
/// Each identifier is registered with the collision detector under the
/// namespace it must be unique in, whether or not shortening changed it.
/// Collisions are reported when the result is built, all at once.
#[derive(Debug)]
pub struct DialectIdentifierShortening;

impl RelationalModelSetPass for DialectIdentifierShortening {
    fn name(&self) -> &'static str {
        "DialectIdentifierShortening"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let mut shortener = Shortener {
            rules: cx.rules,
            detector: &mut cx.collision_detector,
        };

        for info in cx.project_infos.values_mut() {
            shortener.schema(&mut info.physical_schema);
        }

        for model in &mut cx.concrete_resources {
            shortener.resource(model);
        }

        for info in &mut cx.abstract_identity_tables {
            shortener.table_model(&mut info.table);
        }

        for view in &mut cx.abstract_union_views {
            shortener.union_view(view);
        }

        for index in &mut cx.indexes {
            shortener.index(index);
        }

        for trigger in &mut cx.triggers {
            shortener.trigger(trigger);
        }

        Ok(())
    }
}

struct Shortener<'a> {
    rules: &'a dyn SqlDialectRules,
    detector: &'a mut OverrideCollisionDetector,
}

impl Shortener<'_> {
    fn shorten(&mut self, scope: IdentifierScope, name: &mut String) {
        let shortened = self.rules.shorten_identifier(name);
        if shortened != *name {
            log::trace!("{scope}: '{name}' shortened to '{shortened}'");
        }
        self.detector.register(scope, name.clone(), shortened.clone());
        *name = shortened;
    }

    fn schema(&mut self, schema: &mut String) {
        self.shorten(IdentifierScope::Schema, schema);
    }

    fn table(&mut self, table: &mut DbTableName) {
        self.schema(&mut table.schema);
        let scope = IdentifierScope::Table {
            schema: table.schema.clone(),
        };
        self.shorten(scope, &mut table.name);
    }

    /// `column` on `table`, whose name is already shortened.
    fn column(&mut self, table: &DbTableName, column: &mut String) {
        let scope = IdentifierScope::Column {
            table: table.clone(),
        };
        self.shorten(scope, column);
    }

    fn columns(&mut self, table: &DbTableName, columns: &mut [String]) {
        for column in columns {
            self.column(table, column);
        }
    }

    fn constraint_name(&mut self, table: &DbTableName, name: &mut String) {
        let scope = IdentifierScope::Constraint {
            schema: table.schema.clone(),
        };
        self.shorten(scope, name);
    }

    fn binding(&mut self, binding: &mut ColumnBinding) {
        self.table(&mut binding.table);
        self.column(&binding.table, &mut binding.column);
    }

    fn resource(&mut self, model: &mut ConcreteResourceModel) {
        let relational = &mut model.relational_model;

        self.schema(&mut relational.physical_schema);
        self.table(&mut relational.root);

        for table in &mut relational.tables {
            self.table_model(table);
        }

        for binding in &mut relational.document_reference_bindings {
            self.table(&mut binding.table);
            self.column(&binding.table, &mut binding.fk_column);
            for identity in &mut binding.identity_bindings {
                self.column(&binding.table, &mut identity.column);
            }
        }

        for edge in &mut relational.descriptor_edge_sources {
            self.table(&mut edge.table);
            self.column(&edge.table, &mut edge.fk_column);
        }

        let diagnostics = &mut relational.key_unification_equality_constraints;
        for applied in &mut diagnostics.applied {
            self.table(&mut applied.table);
            self.column(&applied.table, &mut applied.endpoint_a_column);
            self.column(&applied.table, &mut applied.endpoint_b_column);
            self.column(&applied.table, &mut applied.canonical_column);
        }
        for redundant in &mut diagnostics.redundant {
            self.binding(&mut redundant.binding);
        }
        for ignored in &mut diagnostics.ignored {
            self.binding(&mut ignored.endpoint_a_binding);
            self.binding(&mut ignored.endpoint_b_binding);
        }

        if let Some(metadata) = &mut model.descriptor_metadata {
            self.table(&mut metadata.table);
            self.columns(&metadata.table, &mut metadata.columns);
        }
    }

    fn table_model(&mut self, table: &mut DbTableModel) {
        self.table(&mut table.table);
        let name = table.table.clone();

        for key in &mut table.key_columns {
            self.column(&name, &mut key.name);
        }

        for column in &mut table.columns {
            self.column(&name, &mut column.name);
            if let ColumnStorage::UnifiedAlias {
                canonical_column,
                presence_column,
            } = &mut column.storage
            {
                self.column(&name, canonical_column);
                if let Some(presence) = presence_column {
                    self.column(&name, presence);
                }
            }
        }

        for class in &mut table.key_unification_classes {
            self.column(&name, &mut class.canonical_column);
            self.columns(&name, &mut class.member_columns);
        }

        for deduplication in &mut table.descriptor_fk_deduplications {
            self.column(&name, &mut deduplication.storage_column);
            self.columns(&name, &mut deduplication.binding_columns);
            self.constraint_name(&name, &mut deduplication.constraint_name);
        }

        for constraint in &mut table.constraints {
            self.constraint(&name, constraint);
        }
    }

    fn constraint(&mut self, table: &DbTableName, constraint: &mut TableConstraint) {
        self.constraint_name(table, constraint.name_mut());

        match constraint {
            TableConstraint::Unique { columns, .. } => self.columns(table, columns),
            TableConstraint::ForeignKey {
                columns,
                target_table,
                target_columns,
                ..
            } => {
                self.columns(table, columns);
                self.table(target_table);
                self.columns(target_table, target_columns);
            }
            TableConstraint::AllOrNoneNullability {
                fk_column,
                dependent_columns,
                ..
            } => {
                self.column(table, fk_column);
                self.columns(table, dependent_columns);
            }
            TableConstraint::NullOrTrue { column, .. } => self.column(table, column),
        }
    }

    fn union_view(&mut self, view: &mut AbstractUnionViewInfo) {
        self.table(&mut view.view);
        for column in &mut view.output_columns {
            self.column(&view.view, &mut column.name);
        }

        for arm in &mut view.arms {
            self.table(&mut arm.from_table);
            for projection in &mut arm.projections {
                if let UnionViewProjection::Column(column) = projection {
                    self.column(&arm.from_table, column);
                }
            }
        }
    }

    fn index(&mut self, index: &mut DbIndexInfo) {
        self.table(&mut index.table);
        self.columns(&index.table, &mut index.columns);

        let scope = match self.rules.index_name_scope() {
            NameScope::Schema => IdentifierScope::IndexInSchema {
                schema: index.table.schema.clone(),
            },
            NameScope::Table => IdentifierScope::IndexOnTable {
                table: index.table.clone(),
            },
        };
        self.shorten(scope, &mut index.name);
    }

    fn trigger(&mut self, trigger: &mut DbTriggerInfo) {
        self.table(&mut trigger.table);
        self.columns(&trigger.table, &mut trigger.key_columns);
        self.columns(&trigger.table, &mut trigger.identity_projection_columns);

        if let TriggerKind::AbstractIdentityMaintenance { target_table } = &mut trigger.kind {
            self.table(target_table);
        }

        let scope = match self.rules.trigger_name_scope() {
            NameScope::Schema => IdentifierScope::TriggerInSchema {
                schema: trigger.table.schema.clone(),
            },
            NameScope::Table => IdentifierScope::TriggerOnTable {
                table: trigger.table.clone(),
            },
        };
        self.shorten(scope, &mut trigger.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        db::{ColumnKind, DbColumnModel, RelationalScalarType},
        JsonPath, PgsqlDialectRules,
    };

    #[test]
    fn long_names_are_shortened_and_registered() {
        let mut detector = OverrideCollisionDetector::new();
        let mut shortener = Shortener {
            rules: &PgsqlDialectRules,
            detector: &mut detector,
        };

        let long = "A".repeat(70);
        let mut table = DbTableModel::new(DbTableName::new("edfi", "Student"), JsonPath::root());
        table.push_column(DbColumnModel::new(
            long.clone(),
            ColumnKind::Scalar,
            RelationalScalarType::int32(),
        ));
        table.push_constraint(TableConstraint::Unique {
            name: "UX_Student".to_string(),
            columns: vec![long.clone()],
        });

        shortener.table_model(&mut table);

        let shortened = &table.columns[0].name;
        assert_eq!(shortened.len(), 63);
        assert_eq!(table.constraints[0].local_columns(), [shortened.as_str()]);
        assert!(detector.is_empty());
    }

    #[test]
    fn distinct_names_shortening_alike_collide() {
        let mut detector = OverrideCollisionDetector::new();
        let table = DbTableName::new("edfi", "Student");

        let mut a = "Same".to_string();
        detector.register(
            IdentifierScope::Column {
                table: table.clone(),
            },
            "SameButLonger",
            "Same",
        );
        Shortener {
            rules: &PgsqlDialectRules,
            detector: &mut detector,
        }
        .column(&table, &mut a);

        assert_eq!(detector.collisions().len(), 1);
    }
}
