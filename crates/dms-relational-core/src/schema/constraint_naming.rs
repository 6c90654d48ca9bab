//! Default names for derived constraints, indexes and triggers. `T` is the
//! unqualified table name.

use super::{db::DbTableName, name::column_tokens};

pub(crate) fn primary_key(table: &DbTableName) -> String {
    format!("PK_{}", table.name)
}

pub(crate) fn document_fk(table: &DbTableName) -> String {
    format!("FK_{}_Document", table.name)
}

pub(crate) fn parent_fk(table: &DbTableName, parent: &DbTableName) -> String {
    format!("FK_{}_{}", table.name, parent.name)
}

pub(crate) fn reference_fk(table: &DbTableName, reference_base: &str) -> String {
    format!("FK_{}_{reference_base}", table.name)
}

/// `FK_{T}_{column}` with the `_DescriptorId` suffix removed.
pub(crate) fn descriptor_fk(table: &DbTableName, storage_column: &str) -> String {
    let base = storage_column
        .strip_suffix("_DescriptorId")
        .unwrap_or(storage_column);
    format!("FK_{}_{base}", table.name)
}

pub(crate) fn natural_key(table: &DbTableName) -> String {
    format!("UX_{}_NK", table.name)
}

pub(crate) fn reference_key(table: &DbTableName) -> String {
    format!("UX_{}_RefKey", table.name)
}

pub(crate) fn unique<S: AsRef<str>>(table: &DbTableName, columns: &[S]) -> String {
    format!("UX_{}_{}", table.name, column_tokens(columns))
}

pub(crate) fn all_or_none(table: &DbTableName, reference_base: &str) -> String {
    format!("CK_{}_{reference_base}_AllNone", table.name)
}

pub(crate) fn null_or_true(table: &DbTableName, column: &str) -> String {
    format!("CK_{}_{column}_NullOrTrue", table.name)
}

pub(crate) fn fk_support_index<S: AsRef<str>>(table: &DbTableName, columns: &[S]) -> String {
    format!("IX_{}_{}", table.name, column_tokens(columns))
}

pub(crate) fn stamp_trigger(table: &DbTableName) -> String {
    format!("TR_{}_Stamp", table.name)
}

pub(crate) fn referential_identity_trigger(table: &DbTableName) -> String {
    format!("TR_{}_ReferentialIdentity", table.name)
}

pub(crate) fn abstract_identity_trigger(table: &DbTableName) -> String {
    format!("TR_{}_AbstractIdentity", table.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_fk_drops_suffix() {
        let table = DbTableName::new("edfi", "Student");
        assert_eq!(
            descriptor_fk(&table, "BirthSexDescriptor_DescriptorId"),
            "FK_Student_BirthSexDescriptor"
        );
        assert_eq!(
            descriptor_fk(&table, "GradeLevelDescriptor_Unified_DescriptorId"),
            "FK_Student_GradeLevelDescriptor_Unified"
        );
    }

    #[test]
    fn unique_uses_column_tokens() {
        let table = DbTableName::new("edfi", "SessionGradingPeriod");
        assert_eq!(
            unique(&table, &["GradingPeriod_SchoolId", "GradingPeriod_PeriodSequence"]),
            "UX_SessionGradingPeriod_GradingPeriod_PeriodSequence_SchoolId"
        );
    }
}
