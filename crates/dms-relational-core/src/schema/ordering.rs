//! Canonical ordering of derived tables and inventories.
//!
//! Pass outputs depend on traversal order; sorting here is what makes two
//! builds over the same input produce identical models.

use super::db::{
    AbstractIdentityTableInfo, AbstractUnionViewInfo, ColumnKind, ConcreteResourceModel,
    DbIndexInfo, DbTableModel, DbTableName, DbTriggerInfo,
};

use std::cmp::Ordering;

/// Sorts the columns, constraints, key-unification classes and descriptor FK
/// deduplications of `table`.
///
/// Columns: key columns first in key order, then descriptor FKs, then
/// scalars, then everything else; ties by ordinal name.
pub fn canonicalize_table(table: &mut DbTableModel) {
    let key_order: Vec<String> = table.key_column_names();

    let rank = |name: &str, kind: ColumnKind| -> (usize, usize) {
        if let Some(position) = key_order.iter().position(|key| key == name) {
            return (0, position);
        }
        match kind {
            ColumnKind::DescriptorFk => (1, 0),
            ColumnKind::Scalar => (2, 0),
            _ => (3, 0),
        }
    };

    table.columns.sort_by(|a, b| {
        rank(&a.name, a.kind)
            .cmp(&rank(&b.name, b.kind))
            .then_with(|| a.name.cmp(&b.name))
    });

    table
        .constraints
        .sort_by(|a, b| a.kind().cmp(&b.kind()).then_with(|| a.name().cmp(b.name())));

    table
        .key_unification_classes
        .sort_by(|a, b| a.canonical_column.cmp(&b.canonical_column));

    table
        .descriptor_fk_deduplications
        .sort_by(|a, b| a.storage_column.cmp(&b.storage_column));
}

pub(crate) fn sort_resources(resources: &mut [ConcreteResourceModel]) {
    resources.sort_by(|a, b| a.resource().cmp(b.resource()));
}

pub(crate) fn sort_abstract_identity_tables(tables: &mut [AbstractIdentityTableInfo]) {
    tables.sort_by(|a, b| a.abstract_resource.cmp(&b.abstract_resource));
}

pub(crate) fn sort_union_views(views: &mut [AbstractUnionViewInfo]) {
    views.sort_by(|a, b| a.abstract_resource.cmp(&b.abstract_resource));
}

pub(crate) fn sort_indexes(indexes: &mut [DbIndexInfo]) {
    indexes.sort_by(|a, b| by_table_then_name(&a.table, &a.name, &b.table, &b.name));
}

pub(crate) fn sort_triggers(triggers: &mut [DbTriggerInfo]) {
    triggers.sort_by(|a, b| by_table_then_name(&a.table, &a.name, &b.table, &b.name));
}

fn by_table_then_name(a_table: &DbTableName, a_name: &str, b_table: &DbTableName, b_name: &str) -> Ordering {
    a_table
        .schema
        .cmp(&b_table.schema)
        .then_with(|| a_table.name.cmp(&b_table.name))
        .then_with(|| a_name.cmp(b_name))
}
