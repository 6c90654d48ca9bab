use super::{
    table::owning_table_index, DbTableModel, DbTableName,
    KeyUnificationEqualityConstraintDiagnostics,
};
use crate::{
    effective::ResourceKeyEntry,
    schema::{JsonPath, QualifiedResourceName},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStorageKind {
    /// Stored in the resource's own tables
    RelationalTables,

    /// Stored in the shared descriptor table
    SharedDescriptorTable,
}

impl ResourceStorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceStorageKind::RelationalTables => "RelationalTables",
            ResourceStorageKind::SharedDescriptorTable => "SharedDescriptorTable",
        }
    }
}

/// One identity part of a reference and the local column holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIdentityBinding {
    /// Path in the target resource
    pub identity_json_path: JsonPath,
    /// Path in the referencing resource
    pub reference_json_path: JsonPath,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReferenceBinding {
    pub is_identity_component: bool,
    pub reference_object_path: JsonPath,
    pub table: DbTableName,
    pub fk_column: String,
    pub target_resource: QualifiedResourceName,
    pub identity_bindings: Vec<ReferenceIdentityBinding>,
}

/// A descriptor-valued path bound to a descriptor FK column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEdgeSource {
    pub is_identity_component: bool,
    pub descriptor_value_path: JsonPath,
    pub table: DbTableName,
    pub fk_column: String,
    pub descriptor_resource: QualifiedResourceName,
}

/// A location where extension projects attach fields under `_ext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSite {
    pub owning_scope: JsonPath,
    pub extension_path: JsonPath,
    /// Sorted, distinct
    pub project_keys: Vec<String>,
}

/// The relational shape of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationalResourceModel {
    pub resource: QualifiedResourceName,
    pub physical_schema: String,
    pub storage_kind: ResourceStorageKind,
    pub root: DbTableName,
    /// Parents precede their children
    pub tables: Vec<DbTableModel>,
    pub document_reference_bindings: Vec<DocumentReferenceBinding>,
    pub descriptor_edge_sources: Vec<DescriptorEdgeSource>,
    pub key_unification_equality_constraints: KeyUnificationEqualityConstraintDiagnostics,
}

impl RelationalResourceModel {
    pub fn table(&self, name: &DbTableName) -> Option<&DbTableModel> {
        self.tables.iter().find(|table| &table.table == name)
    }

    pub fn table_mut(&mut self, name: &DbTableName) -> Option<&mut DbTableModel> {
        self.tables.iter_mut().find(|table| &table.table == name)
    }

    pub fn root_table(&self) -> Option<&DbTableModel> {
        self.table(&self.root)
    }

    /// The table whose scope most specifically contains `path`.
    pub fn owning_table(&self, path: &JsonPath) -> Option<&DbTableModel> {
        owning_table_index(&self.tables, path).map(|index| &self.tables[index])
    }
}

/// Column contract of the shared descriptor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorMetadata {
    pub table: DbTableName,
    pub columns: Vec<String>,
    /// Value written to the `Discriminator` column for this descriptor
    pub discriminator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteResourceModel {
    pub resource_key: ResourceKeyEntry,
    pub storage_kind: ResourceStorageKind,
    pub relational_model: RelationalResourceModel,
    pub descriptor_metadata: Option<DescriptorMetadata>,
    pub extension_sites: Vec<ExtensionSite>,
}

impl ConcreteResourceModel {
    pub fn resource(&self) -> &QualifiedResourceName {
        &self.relational_model.resource
    }
}
