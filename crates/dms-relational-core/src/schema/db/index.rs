use super::DbTableName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    PrimaryKey,
    UniqueConstraint,
    ForeignKeySupport,
    Explicit,
}

impl IndexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::PrimaryKey => "PrimaryKey",
            IndexKind::UniqueConstraint => "UniqueConstraint",
            IndexKind::ForeignKeySupport => "ForeignKeySupport",
            IndexKind::Explicit => "Explicit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbIndexInfo {
    pub name: String,
    pub table: DbTableName,
    pub columns: Vec<String>,
    pub kind: IndexKind,
    pub is_unique: bool,
}
