use super::DbTableName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
}

impl ReferentialAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NoAction",
            ReferentialAction::Cascade => "Cascade",
        }
    }
}

/// Discriminant of [`TableConstraint`], in canonical sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableConstraintKind {
    Unique,
    ForeignKey,
    AllOrNoneNullability,
    NullOrTrue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableConstraint {
    Unique {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        target_table: DbTableName,
        target_columns: Vec<String>,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    },
    /// `fk_column` and every dependent column are all null or all non-null.
    AllOrNoneNullability {
        name: String,
        fk_column: String,
        dependent_columns: Vec<String>,
    },
    /// `column` is null or true.
    NullOrTrue { name: String, column: String },
}

impl TableConstraint {
    pub fn name(&self) -> &str {
        match self {
            TableConstraint::Unique { name, .. }
            | TableConstraint::ForeignKey { name, .. }
            | TableConstraint::AllOrNoneNullability { name, .. }
            | TableConstraint::NullOrTrue { name, .. } => name,
        }
    }

    pub fn name_mut(&mut self) -> &mut String {
        match self {
            TableConstraint::Unique { name, .. }
            | TableConstraint::ForeignKey { name, .. }
            | TableConstraint::AllOrNoneNullability { name, .. }
            | TableConstraint::NullOrTrue { name, .. } => name,
        }
    }

    pub fn kind(&self) -> TableConstraintKind {
        match self {
            TableConstraint::Unique { .. } => TableConstraintKind::Unique,
            TableConstraint::ForeignKey { .. } => TableConstraintKind::ForeignKey,
            TableConstraint::AllOrNoneNullability { .. } => TableConstraintKind::AllOrNoneNullability,
            TableConstraint::NullOrTrue { .. } => TableConstraintKind::NullOrTrue,
        }
    }

    /// Identity of the constraint apart from its name.
    pub fn signature(&self, table: &DbTableName) -> String {
        match self {
            TableConstraint::Unique { columns, .. } => {
                format!("Unique|{table}|{}", columns.join(","))
            }
            TableConstraint::ForeignKey {
                columns,
                target_table,
                target_columns,
                on_delete,
                on_update,
                ..
            } => format!(
                "ForeignKey|{table}|{}|{target_table}|{}|{}|{}",
                columns.join(","),
                target_columns.join(","),
                on_delete.as_str(),
                on_update.as_str()
            ),
            TableConstraint::AllOrNoneNullability {
                fk_column,
                dependent_columns,
                ..
            } => format!(
                "AllOrNoneNullability|{table}|{fk_column}|{}",
                dependent_columns.join(",")
            ),
            TableConstraint::NullOrTrue { column, .. } => format!("NullOrTrue|{table}|{column}"),
        }
    }

    /// Every column name the constraint mentions on its own table.
    pub fn local_columns(&self) -> Vec<&str> {
        match self {
            TableConstraint::Unique { columns, .. } | TableConstraint::ForeignKey { columns, .. } => {
                columns.iter().map(String::as_str).collect()
            }
            TableConstraint::AllOrNoneNullability {
                fk_column,
                dependent_columns,
                ..
            } => std::iter::once(fk_column.as_str())
                .chain(dependent_columns.iter().map(String::as_str))
                .collect(),
            TableConstraint::NullOrTrue { column, .. } => vec![column.as_str()],
        }
    }
}
