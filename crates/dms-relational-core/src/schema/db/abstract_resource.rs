use super::{DbTableModel, DbTableName, RelationalScalarType};
use crate::schema::{JsonPath, QualifiedResourceName};

/// Shared identity table for the concrete members of an abstract resource.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractIdentityTableInfo {
    pub abstract_resource: QualifiedResourceName,
    pub table: DbTableModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionViewOutputColumn {
    pub name: String,
    pub ty: RelationalScalarType,
    pub source_path: Option<JsonPath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionViewProjection {
    Column(String),
    /// A constant discriminator value
    Literal(String),
}

/// One `SELECT` of the union view, reading a member's root table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionViewArm {
    pub concrete_resource: QualifiedResourceName,
    pub from_table: DbTableName,
    /// One projection per output column, in output order
    pub projections: Vec<UnionViewProjection>,
}

/// View presenting every concrete member row as the abstract resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractUnionViewInfo {
    pub abstract_resource: QualifiedResourceName,
    pub view: DbTableName,
    pub output_columns: Vec<UnionViewOutputColumn>,
    pub arms: Vec<UnionViewArm>,
}
