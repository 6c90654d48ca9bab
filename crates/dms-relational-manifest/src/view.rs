//! Borrowed, serializable views of the model.

use crate::{resolve_descriptor_fk_constraint_name, Result};

use dms_relational_core::schema::{
    db::{
        ColumnStorage, DbColumnModel, DbKeyColumn, DbTableModel, DbTableName,
        DescriptorEdgeSource, DocumentReferenceBinding, ExtensionSite,
        KeyUnificationEqualityConstraintDiagnostics, RelationalResourceModel, RelationalScalarType,
        ResourceStorageKind, TableConstraint,
    },
    JsonPath, QualifiedResourceName,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
pub(crate) struct ResourceRef<'a> {
    project_name: &'a str,
    resource_name: &'a str,
}

impl<'a> ResourceRef<'a> {
    pub(crate) fn new(resource: &'a QualifiedResourceName) -> Self {
        ResourceRef {
            project_name: &resource.project_name,
            resource_name: &resource.resource_name,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct TableRef<'a> {
    schema: &'a str,
    name: &'a str,
}

impl<'a> TableRef<'a> {
    pub(crate) fn new(table: &'a DbTableName) -> Self {
        TableRef {
            schema: &table.schema,
            name: &table.name,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ScalarTypeView {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<u32>,
}

impl ScalarTypeView {
    pub(crate) fn new(ty: &RelationalScalarType) -> Self {
        ScalarTypeView {
            kind: ty.kind.as_str(),
            max_length: ty.max_length,
            precision: ty.decimal.map(|(precision, _)| precision),
            scale: ty.decimal.map(|(_, scale)| scale),
        }
    }
}

#[derive(Serialize)]
struct KeyColumnView<'a> {
    name: &'a str,
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "kind")]
enum StorageView<'a> {
    Stored,
    UnifiedAlias {
        canonical_column: &'a str,
        presence_column: Option<&'a str>,
    },
}

#[derive(Serialize)]
struct ColumnView<'a> {
    name: &'a str,
    kind: &'static str,
    #[serde(rename = "type")]
    ty: Option<ScalarTypeView>,
    is_nullable: bool,
    source_path: Option<&'a JsonPath>,
    storage: StorageView<'a>,
}

impl<'a> ColumnView<'a> {
    fn new(column: &'a DbColumnModel) -> Self {
        ColumnView {
            name: &column.name,
            kind: column.kind.as_str(),
            ty: column.ty.as_ref().map(ScalarTypeView::new),
            is_nullable: column.nullable,
            source_path: column.source_path.as_ref(),
            storage: match &column.storage {
                ColumnStorage::Stored => StorageView::Stored,
                ColumnStorage::UnifiedAlias {
                    canonical_column,
                    presence_column,
                } => StorageView::UnifiedAlias {
                    canonical_column,
                    presence_column: presence_column.as_deref(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct KeyUnificationClassView<'a> {
    canonical_column: &'a str,
    member_columns: &'a [String],
}

#[derive(Serialize)]
struct DescriptorFkDeduplicationView<'a> {
    storage_column: &'a str,
    binding_columns: Vec<&'a str>,
    /// Re-resolved from the table's constraints
    constraint_name: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "kind")]
enum ConstraintView<'a> {
    Unique {
        name: &'a str,
        columns: &'a [String],
    },
    ForeignKey {
        name: &'a str,
        columns: &'a [String],
        target_table: TableRef<'a>,
        target_columns: &'a [String],
        on_delete: &'static str,
        on_update: &'static str,
    },
    AllOrNoneNullability {
        name: &'a str,
        fk_column: &'a str,
        dependent_columns: &'a [String],
    },
    NullOrTrue {
        name: &'a str,
        column: &'a str,
    },
}

impl<'a> ConstraintView<'a> {
    fn new(constraint: &'a TableConstraint) -> Self {
        match constraint {
            TableConstraint::Unique { name, columns } => ConstraintView::Unique { name, columns },
            TableConstraint::ForeignKey {
                name,
                columns,
                target_table,
                target_columns,
                on_delete,
                on_update,
            } => ConstraintView::ForeignKey {
                name,
                columns,
                target_table: TableRef::new(target_table),
                target_columns,
                on_delete: on_delete.as_str(),
                on_update: on_update.as_str(),
            },
            TableConstraint::AllOrNoneNullability {
                name,
                fk_column,
                dependent_columns,
            } => ConstraintView::AllOrNoneNullability {
                name,
                fk_column,
                dependent_columns,
            },
            TableConstraint::NullOrTrue { name, column } => ConstraintView::NullOrTrue { name, column },
        }
    }
}

#[derive(Serialize)]
pub(crate) struct TableView<'a> {
    schema: &'a str,
    name: &'a str,
    scope: &'a JsonPath,
    key_columns: Vec<KeyColumnView<'a>>,
    columns: Vec<ColumnView<'a>>,
    key_unification_classes: Vec<KeyUnificationClassView<'a>>,
    descriptor_fk_deduplications: Vec<DescriptorFkDeduplicationView<'a>>,
    constraints: Vec<ConstraintView<'a>>,
}

impl<'a> TableView<'a> {
    /// Fails when a deduplicated descriptor column does not resolve to
    /// exactly one foreign key.
    pub(crate) fn new(table: &'a DbTableModel) -> Result<Self> {
        let mut deduplications: Vec<_> = table.descriptor_fk_deduplications.iter().collect();
        deduplications.sort_by(|a, b| {
            a.storage_column
                .cmp(&b.storage_column)
                .then_with(|| a.binding_columns.join("|").cmp(&b.binding_columns.join("|")))
        });

        let descriptor_fk_deduplications = deduplications
            .into_iter()
            .map(|deduplication| {
                let mut binding_columns: Vec<&str> =
                    deduplication.binding_columns.iter().map(String::as_str).collect();
                binding_columns.sort_unstable();

                Ok(DescriptorFkDeduplicationView {
                    storage_column: &deduplication.storage_column,
                    binding_columns,
                    constraint_name: resolve_descriptor_fk_constraint_name(
                        table,
                        &deduplication.storage_column,
                    )?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(TableView {
            schema: &table.table.schema,
            name: &table.table.name,
            scope: &table.scope,
            key_columns: table.key_columns.iter().map(key_column).collect(),
            columns: table.columns.iter().map(ColumnView::new).collect(),
            key_unification_classes: table
                .key_unification_classes
                .iter()
                .map(|class| KeyUnificationClassView {
                    canonical_column: &class.canonical_column,
                    member_columns: &class.member_columns,
                })
                .collect(),
            descriptor_fk_deduplications,
            constraints: table.constraints.iter().map(ConstraintView::new).collect(),
        })
    }
}

fn key_column(key: &DbKeyColumn) -> KeyColumnView<'_> {
    KeyColumnView {
        name: &key.name,
        kind: key.kind.as_str(),
    }
}

#[derive(Serialize)]
struct BindingView<'a> {
    table: TableRef<'a>,
    column: &'a str,
}

#[derive(Serialize)]
struct AppliedView<'a> {
    endpoint_a_path: &'a JsonPath,
    endpoint_b_path: &'a JsonPath,
    table: TableRef<'a>,
    endpoint_a_column: &'a str,
    endpoint_b_column: &'a str,
    canonical_column: &'a str,
}

#[derive(Serialize)]
struct RedundantView<'a> {
    endpoint_a_path: &'a JsonPath,
    endpoint_b_path: &'a JsonPath,
    binding: BindingView<'a>,
}

#[derive(Serialize)]
struct IgnoredView<'a> {
    endpoint_a_path: &'a JsonPath,
    endpoint_b_path: &'a JsonPath,
    reason: &'a str,
    endpoint_a_binding: BindingView<'a>,
    endpoint_b_binding: BindingView<'a>,
}

#[derive(Serialize)]
pub(crate) struct DiagnosticsView<'a> {
    applied: Vec<AppliedView<'a>>,
    redundant: Vec<RedundantView<'a>>,
    ignored: Vec<IgnoredView<'a>>,
    ignored_by_reason: &'a BTreeMap<String, usize>,
}

impl<'a> DiagnosticsView<'a> {
    pub(crate) fn new(diagnostics: &'a KeyUnificationEqualityConstraintDiagnostics) -> Self {
        DiagnosticsView {
            applied: diagnostics
                .applied
                .iter()
                .map(|applied| AppliedView {
                    endpoint_a_path: &applied.endpoint_a_path,
                    endpoint_b_path: &applied.endpoint_b_path,
                    table: TableRef::new(&applied.table),
                    endpoint_a_column: &applied.endpoint_a_column,
                    endpoint_b_column: &applied.endpoint_b_column,
                    canonical_column: &applied.canonical_column,
                })
                .collect(),
            redundant: diagnostics
                .redundant
                .iter()
                .map(|redundant| RedundantView {
                    endpoint_a_path: &redundant.endpoint_a_path,
                    endpoint_b_path: &redundant.endpoint_b_path,
                    binding: BindingView {
                        table: TableRef::new(&redundant.binding.table),
                        column: &redundant.binding.column,
                    },
                })
                .collect(),
            ignored: diagnostics
                .ignored
                .iter()
                .map(|ignored| IgnoredView {
                    endpoint_a_path: &ignored.endpoint_a_path,
                    endpoint_b_path: &ignored.endpoint_b_path,
                    reason: &ignored.reason,
                    endpoint_a_binding: BindingView {
                        table: TableRef::new(&ignored.endpoint_a_binding.table),
                        column: &ignored.endpoint_a_binding.column,
                    },
                    endpoint_b_binding: BindingView {
                        table: TableRef::new(&ignored.endpoint_b_binding.table),
                        column: &ignored.endpoint_b_binding.column,
                    },
                })
                .collect(),
            ignored_by_reason: &diagnostics.ignored_by_reason,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct DescriptorEdgeView<'a> {
    is_identity_component: bool,
    descriptor_value_path: &'a JsonPath,
    table: TableRef<'a>,
    fk_column: &'a str,
    descriptor_resource: ResourceRef<'a>,
}

impl<'a> DescriptorEdgeView<'a> {
    pub(crate) fn new(edge: &'a DescriptorEdgeSource) -> Self {
        DescriptorEdgeView {
            is_identity_component: edge.is_identity_component,
            descriptor_value_path: &edge.descriptor_value_path,
            table: TableRef::new(&edge.table),
            fk_column: &edge.fk_column,
            descriptor_resource: ResourceRef::new(&edge.descriptor_resource),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ExtensionSiteView<'a> {
    owning_scope: &'a JsonPath,
    extension_path: &'a JsonPath,
    project_keys: &'a [String],
}

impl<'a> ExtensionSiteView<'a> {
    pub(crate) fn new(site: &'a ExtensionSite) -> Self {
        ExtensionSiteView {
            owning_scope: &site.owning_scope,
            extension_path: &site.extension_path,
            project_keys: &site.project_keys,
        }
    }
}

#[derive(Serialize)]
struct IdentityBindingView<'a> {
    identity_json_path: &'a JsonPath,
    reference_json_path: &'a JsonPath,
    column: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ReferenceBindingView<'a> {
    is_identity_component: bool,
    reference_object_path: &'a JsonPath,
    table: TableRef<'a>,
    fk_column: &'a str,
    target_resource: ResourceRef<'a>,
    identity_bindings: Vec<IdentityBindingView<'a>>,
}

impl<'a> ReferenceBindingView<'a> {
    pub(crate) fn new(binding: &'a DocumentReferenceBinding) -> Self {
        ReferenceBindingView {
            is_identity_component: binding.is_identity_component,
            reference_object_path: &binding.reference_object_path,
            table: TableRef::new(&binding.table),
            fk_column: &binding.fk_column,
            target_resource: ResourceRef::new(&binding.target_resource),
            identity_bindings: binding
                .identity_bindings
                .iter()
                .map(|identity| IdentityBindingView {
                    identity_json_path: &identity.identity_json_path,
                    reference_json_path: &identity.reference_json_path,
                    column: &identity.column,
                })
                .collect(),
        }
    }
}

/// Tables of `model`; descriptor resources have none.
pub(crate) fn table_views(model: &RelationalResourceModel) -> Result<Vec<TableView<'_>>> {
    if model.storage_kind == ResourceStorageKind::SharedDescriptorTable {
        return Ok(vec![]);
    }
    model.tables.iter().map(TableView::new).collect()
}
