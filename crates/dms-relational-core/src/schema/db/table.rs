use super::{
    ColumnKind, ColumnStorage, DbColumnModel, DescriptorForeignKeyDeduplication,
    KeyUnificationClass, TableConstraint,
};
use crate::schema::JsonPath;

use std::fmt;

/// Schema-qualified table (or view) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbTableName {
    pub schema: String,
    pub name: String,
}

impl DbTableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        DbTableName {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DbTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One column of a table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbKeyColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// One derived table.
///
/// The table materializes the JSON subtree at `scope`: the document root for
/// a resource's root table, an array element for a collection table.
#[derive(Debug, Clone, PartialEq)]
pub struct DbTableModel {
    pub table: DbTableName,

    pub scope: JsonPath,

    /// Primary key columns, in key order
    pub key_columns: Vec<DbKeyColumn>,

    pub columns: Vec<DbColumnModel>,

    pub key_unification_classes: Vec<KeyUnificationClass>,

    pub descriptor_fk_deduplications: Vec<DescriptorForeignKeyDeduplication>,

    pub constraints: Vec<TableConstraint>,
}

impl DbTableModel {
    pub fn new(table: DbTableName, scope: JsonPath) -> Self {
        DbTableModel {
            table,
            scope,
            key_columns: vec![],
            columns: vec![],
            key_unification_classes: vec![],
            descriptor_fk_deduplications: vec![],
            constraints: vec![],
        }
    }

    pub fn column(&self, name: &str) -> Option<&DbColumnModel> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut DbColumnModel> {
        self.columns.iter_mut().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The column whose value is read from `path`.
    pub fn column_by_source_path(&self, path: &JsonPath) -> Option<&DbColumnModel> {
        self.columns
            .iter()
            .find(|column| column.source_path.as_ref() == Some(path))
    }

    /// Resolves an alias to the column that physically stores its value.
    pub fn storage_column_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.column(name).map(|column| &column.storage) {
            Some(ColumnStorage::UnifiedAlias {
                canonical_column, ..
            }) => canonical_column,
            _ => name,
        }
    }

    pub fn key_column_names(&self) -> Vec<String> {
        self.key_columns
            .iter()
            .map(|key| key.name.clone())
            .collect()
    }

    /// Key columns inherited from the parent scope: every key column except a
    /// trailing `Ordinal`.
    pub fn parent_key_column_names(&self) -> Vec<String> {
        self.key_columns
            .iter()
            .filter(|key| key.kind != ColumnKind::Ordinal || key.name != "Ordinal")
            .map(|key| key.name.clone())
            .collect()
    }

    pub fn constraint(&self, name: &str) -> Option<&TableConstraint> {
        self.constraints
            .iter()
            .find(|constraint| constraint.name() == name)
    }

    pub fn push_column(&mut self, column: DbColumnModel) {
        self.columns.push(column);
    }

    /// Adds `constraint` unless an identical one is already present.
    pub fn push_constraint(&mut self, constraint: TableConstraint) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }
}

/// Index of the table whose scope most specifically contains `path`.
pub(crate) fn owning_table_index(tables: &[DbTableModel], path: &JsonPath) -> Option<usize> {
    tables
        .iter()
        .enumerate()
        .filter(|(_, table)| path.relative_to_scope(&table.scope).is_some())
        .max_by_key(|(_, table)| table.scope.segments().len())
        .map(|(index, _)| index)
}
