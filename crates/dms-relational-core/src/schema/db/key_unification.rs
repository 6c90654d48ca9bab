use super::DbTableName;
use crate::schema::JsonPath;

use std::collections::BTreeMap;

/// Columns collapsed onto one canonical storage column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUnificationClass {
    pub canonical_column: String,
    /// Sorted by member source path
    pub member_columns: Vec<String>,
}

/// Binding columns sharing one descriptor storage column, and the single
/// foreign key enforcing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorForeignKeyDeduplication {
    pub storage_column: String,
    pub binding_columns: Vec<String>,
    pub constraint_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub table: DbTableName,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEqualityConstraint {
    pub endpoint_a_path: JsonPath,
    pub endpoint_b_path: JsonPath,
    pub table: DbTableName,
    pub endpoint_a_column: String,
    pub endpoint_b_column: String,
    pub canonical_column: String,
}

/// Both endpoints already bind to the same column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantEqualityConstraint {
    pub endpoint_a_path: JsonPath,
    pub endpoint_b_path: JsonPath,
    pub binding: ColumnBinding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredEqualityConstraint {
    pub endpoint_a_path: JsonPath,
    pub endpoint_b_path: JsonPath,
    pub reason: String,
    pub endpoint_a_binding: ColumnBinding,
    pub endpoint_b_binding: ColumnBinding,
}

/// How each declared equality constraint was handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyUnificationEqualityConstraintDiagnostics {
    pub applied: Vec<AppliedEqualityConstraint>,
    pub redundant: Vec<RedundantEqualityConstraint>,
    pub ignored: Vec<IgnoredEqualityConstraint>,
    pub ignored_by_reason: BTreeMap<String, usize>,
}

impl KeyUnificationEqualityConstraintDiagnostics {
    pub fn ignore(&mut self, entry: IgnoredEqualityConstraint) {
        *self
            .ignored_by_reason
            .entry(entry.reason.clone())
            .or_default() += 1;
        self.ignored.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.redundant.is_empty() && self.ignored.is_empty()
    }
}
