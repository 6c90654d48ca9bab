use crate::{
    to_json,
    view::{
        table_views, DescriptorEdgeView, ExtensionSiteView, ReferenceBindingView, ResourceRef,
        ScalarTypeView, TableRef, TableView,
    },
    Result,
};

use dms_relational_core::schema::{
    db::{
        AbstractUnionViewInfo, ConcreteResourceModel, DbIndexInfo, DbTriggerInfo, TriggerKind,
        UnionViewProjection,
    },
    DerivedRelationalModelSet, JsonPath, QualifiedResourceName, SqlDialect,
};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Serialize)]
struct SetManifest<'a> {
    dialect: &'static str,
    projects: Vec<ProjectView<'a>>,
    resources: Vec<ResourceSummaryView<'a>>,
    abstract_identity_tables: Vec<AbstractIdentityTableView<'a>>,
    abstract_union_views: Vec<UnionView<'a>>,
    indexes: Vec<IndexView<'a>>,
    triggers: Vec<TriggerView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_details: Option<Vec<ResourceDetailView<'a>>>,
}

#[derive(Serialize)]
struct ProjectView<'a> {
    project_endpoint_name: &'a str,
    project_name: &'a str,
    project_version: &'a str,
    is_extension: bool,
    physical_schema: &'a str,
}

#[derive(Serialize)]
struct ResourceSummaryView<'a> {
    project_name: &'a str,
    resource_name: &'a str,
    resource_key_id: i16,
    storage_kind: &'static str,
    physical_schema: &'a str,
}

#[derive(Serialize)]
struct AbstractIdentityTableView<'a> {
    resource: ResourceRef<'a>,
    table: TableView<'a>,
}

#[derive(Serialize)]
struct UnionOutputColumnView<'a> {
    column_name: &'a str,
    #[serde(rename = "type")]
    ty: ScalarTypeView,
    source_path: Option<&'a JsonPath>,
}

#[derive(Serialize)]
#[serde(tag = "kind")]
enum ProjectionView<'a> {
    SourceColumn { column_name: &'a str },
    StringLiteral { value: &'a str },
}

#[derive(Serialize)]
struct UnionArmView<'a> {
    concrete_member: ResourceRef<'a>,
    from_table: TableRef<'a>,
    projection_expressions: Vec<ProjectionView<'a>>,
}

#[derive(Serialize)]
struct UnionView<'a> {
    resource: ResourceRef<'a>,
    view_name: TableRef<'a>,
    output_columns: Vec<UnionOutputColumnView<'a>>,
    union_arms: Vec<UnionArmView<'a>>,
}

#[derive(Serialize)]
struct IndexView<'a> {
    name: &'a str,
    table: TableRef<'a>,
    kind: &'static str,
    is_unique: bool,
    key_columns: &'a [String],
}

#[derive(Serialize)]
struct TriggerView<'a> {
    name: &'a str,
    table: TableRef<'a>,
    kind: &'static str,
    key_columns: &'a [String],
    identity_projection_columns: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    target_table: Option<TableRef<'a>>,
}

#[derive(Serialize)]
struct ResourceDetailView<'a> {
    resource: ResourceRef<'a>,
    physical_schema: &'a str,
    storage_kind: &'static str,
    tables: Vec<TableView<'a>>,
    document_reference_bindings: Vec<ReferenceBindingView<'a>>,
    descriptor_edge_sources: Vec<DescriptorEdgeView<'a>>,
    extension_sites: Vec<ExtensionSiteView<'a>>,
}

/// Emits the set-level manifest: projects, resources and the set-wide
/// inventories.
pub fn emit_set_manifest(set: &DerivedRelationalModelSet) -> Result<String> {
    to_json(&set_manifest(set, None)?)
}

/// Like [`emit_set_manifest`], with a `resource_details` section covering
/// each resource in `detailed`.
pub fn emit_set_manifest_with_details(
    set: &DerivedRelationalModelSet,
    detailed: &BTreeSet<QualifiedResourceName>,
) -> Result<String> {
    to_json(&set_manifest(set, Some(detailed))?)
}

fn set_manifest<'a>(
    set: &'a DerivedRelationalModelSet,
    detailed: Option<&BTreeSet<QualifiedResourceName>>,
) -> Result<SetManifest<'a>> {
    let abstract_identity_tables = set
        .abstract_identity_tables_in_name_order
        .iter()
        .map(|info| {
            Ok(AbstractIdentityTableView {
                resource: ResourceRef::new(&info.abstract_resource),
                table: TableView::new(&info.table)?,
            })
        })
        .collect::<Result<_>>()?;

    let resource_details = match detailed {
        Some(detailed) => Some(
            set.concrete_resources_in_name_order
                .iter()
                .filter(|model| detailed.contains(model.resource()))
                .map(resource_detail)
                .collect::<Result<_>>()?,
        ),
        None => None,
    };

    log::debug!(
        "emitting set manifest: {} resources",
        set.concrete_resources_in_name_order.len()
    );

    Ok(SetManifest {
        dialect: match set.dialect {
            SqlDialect::Pgsql => "Pgsql",
            SqlDialect::Mssql => "Mssql",
        },
        projects: set
            .project_schemas_in_endpoint_order
            .iter()
            .map(|project| ProjectView {
                project_endpoint_name: &project.project_endpoint_name,
                project_name: &project.project_name,
                project_version: &project.project_version,
                is_extension: project.is_extension_project,
                physical_schema: &project.physical_schema,
            })
            .collect(),
        resources: set
            .concrete_resources_in_name_order
            .iter()
            .map(|model| ResourceSummaryView {
                project_name: &model.resource().project_name,
                resource_name: &model.resource().resource_name,
                resource_key_id: model.resource_key.resource_key_id,
                storage_kind: model.storage_kind.as_str(),
                physical_schema: &model.relational_model.physical_schema,
            })
            .collect(),
        abstract_identity_tables,
        abstract_union_views: set
            .abstract_union_views_in_name_order
            .iter()
            .map(union_view)
            .collect(),
        indexes: set.indexes_in_create_order.iter().map(index).collect(),
        triggers: set.triggers_in_create_order.iter().map(trigger).collect(),
        resource_details,
    })
}

fn union_view(view: &AbstractUnionViewInfo) -> UnionView<'_> {
    UnionView {
        resource: ResourceRef::new(&view.abstract_resource),
        view_name: TableRef::new(&view.view),
        output_columns: view
            .output_columns
            .iter()
            .map(|column| UnionOutputColumnView {
                column_name: &column.name,
                ty: ScalarTypeView::new(&column.ty),
                source_path: column.source_path.as_ref(),
            })
            .collect(),
        union_arms: view
            .arms
            .iter()
            .map(|arm| UnionArmView {
                concrete_member: ResourceRef::new(&arm.concrete_resource),
                from_table: TableRef::new(&arm.from_table),
                projection_expressions: arm
                    .projections
                    .iter()
                    .map(|projection| match projection {
                        UnionViewProjection::Column(column) => ProjectionView::SourceColumn {
                            column_name: column,
                        },
                        UnionViewProjection::Literal(value) => {
                            ProjectionView::StringLiteral { value }
                        }
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn index(index: &DbIndexInfo) -> IndexView<'_> {
    IndexView {
        name: &index.name,
        table: TableRef::new(&index.table),
        kind: index.kind.as_str(),
        is_unique: index.is_unique,
        key_columns: &index.columns,
    }
}

fn trigger(trigger: &DbTriggerInfo) -> TriggerView<'_> {
    TriggerView {
        name: &trigger.name,
        table: TableRef::new(&trigger.table),
        kind: trigger.kind.as_str(),
        key_columns: &trigger.key_columns,
        identity_projection_columns: &trigger.identity_projection_columns,
        target_table: match &trigger.kind {
            TriggerKind::AbstractIdentityMaintenance { target_table } => {
                Some(TableRef::new(target_table))
            }
            _ => None,
        },
    }
}

fn resource_detail(model: &ConcreteResourceModel) -> Result<ResourceDetailView<'_>> {
    let relational = &model.relational_model;

    Ok(ResourceDetailView {
        resource: ResourceRef::new(&relational.resource),
        physical_schema: &relational.physical_schema,
        storage_kind: relational.storage_kind.as_str(),
        tables: table_views(relational)?,
        document_reference_bindings: relational
            .document_reference_bindings
            .iter()
            .map(ReferenceBindingView::new)
            .collect(),
        descriptor_edge_sources: relational
            .descriptor_edge_sources
            .iter()
            .map(DescriptorEdgeView::new)
            .collect(),
        extension_sites: model
            .extension_sites
            .iter()
            .map(ExtensionSiteView::new)
            .collect(),
    })
}
