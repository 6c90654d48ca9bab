use crate::schema::{JsonPath, QualifiedResourceName};

/// Role of a column within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKind {
    /// Document id inherited from the root, part of every key
    ParentKeyPart,

    /// Position of an array element within its parent
    Ordinal,

    /// Referenced document id
    DocumentFk,

    /// Descriptor document id
    DescriptorFk,

    Scalar,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::ParentKeyPart => "ParentKeyPart",
            ColumnKind::Ordinal => "Ordinal",
            ColumnKind::DocumentFk => "DocumentFk",
            ColumnKind::DescriptorFk => "DescriptorFk",
            ColumnKind::Scalar => "Scalar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Int32,
    Int64,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl ScalarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Date => "Date",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Time => "Time",
        }
    }
}

/// A column type, with length or precision where the kind needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationalScalarType {
    pub kind: ScalarKind,
    pub max_length: Option<u32>,
    /// `(precision, scale)`
    pub decimal: Option<(u32, u32)>,
}

impl RelationalScalarType {
    pub fn new(kind: ScalarKind) -> Self {
        RelationalScalarType {
            kind,
            max_length: None,
            decimal: None,
        }
    }

    pub fn string(max_length: u32) -> Self {
        RelationalScalarType {
            max_length: Some(max_length),
            ..Self::new(ScalarKind::String)
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        RelationalScalarType {
            decimal: Some((precision, scale)),
            ..Self::new(ScalarKind::Decimal)
        }
    }

    pub fn int32() -> Self {
        Self::new(ScalarKind::Int32)
    }

    pub fn int64() -> Self {
        Self::new(ScalarKind::Int64)
    }

    pub fn boolean() -> Self {
        Self::new(ScalarKind::Boolean)
    }
}

/// How a column's value is physically stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnStorage {
    Stored,

    /// The value lives in `canonical_column`. When `presence_column` is set,
    /// the alias only carries a value while that column is non-null.
    UnifiedAlias {
        canonical_column: String,
        presence_column: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbColumnModel {
    pub name: String,
    pub kind: ColumnKind,
    pub ty: Option<RelationalScalarType>,
    pub nullable: bool,
    pub source_path: Option<JsonPath>,
    /// Referenced resource for `DocumentFk` and `DescriptorFk` columns
    pub target_resource: Option<QualifiedResourceName>,
    pub storage: ColumnStorage,
}

impl DbColumnModel {
    pub fn new(name: impl Into<String>, kind: ColumnKind, ty: RelationalScalarType) -> Self {
        DbColumnModel {
            name: name.into(),
            kind,
            ty: Some(ty),
            nullable: false,
            source_path: None,
            target_resource: None,
            storage: ColumnStorage::Stored,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn source_path(mut self, path: JsonPath) -> Self {
        self.source_path = Some(path);
        self
    }

    pub fn target_resource(mut self, target: QualifiedResourceName) -> Self {
        self.target_resource = Some(target);
        self
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.storage, ColumnStorage::UnifiedAlias { .. })
    }
}
