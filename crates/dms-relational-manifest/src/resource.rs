use crate::{
    to_json,
    view::{
        table_views, DescriptorEdgeView, DiagnosticsView, ExtensionSiteView, ResourceRef,
        TableView,
    },
    Error, Result,
};

use dms_relational_core::schema::{
    db::{DbTableModel, ExtensionSite, RelationalResourceModel, TableConstraint},
    CORE_SCHEMA_NAME,
};
use serde::Serialize;

#[derive(Serialize)]
struct ResourceManifest<'a> {
    resource: ResourceRef<'a>,
    physical_schema: &'a str,
    storage_kind: &'static str,
    tables: Vec<TableView<'a>>,
    key_unification_equality_constraints: DiagnosticsView<'a>,
    descriptor_edge_sources: Vec<DescriptorEdgeView<'a>>,
    extension_sites: Vec<ExtensionSiteView<'a>>,
}

/// Emits the manifest of one resource and the extension sites found on it.
pub fn emit_resource_manifest(
    model: &RelationalResourceModel,
    extension_sites: &[ExtensionSite],
) -> Result<String> {
    let manifest = ResourceManifest {
        resource: ResourceRef::new(&model.resource),
        physical_schema: &model.physical_schema,
        storage_kind: model.storage_kind.as_str(),
        tables: table_views(model)?,
        key_unification_equality_constraints: DiagnosticsView::new(
            &model.key_unification_equality_constraints,
        ),
        descriptor_edge_sources: model
            .descriptor_edge_sources
            .iter()
            .map(DescriptorEdgeView::new)
            .collect(),
        extension_sites: extension_sites.iter().map(ExtensionSiteView::new).collect(),
    };

    log::trace!("emitting manifest for {}", model.resource);
    to_json(&manifest)
}

/// The name of the single descriptor foreign key on `storage_column`.
///
/// A descriptor foreign key targets `dms.Descriptor(DocumentId)` from
/// exactly this one column. Zero or several distinct matches are an error.
pub fn resolve_descriptor_fk_constraint_name<'a>(
    table: &'a DbTableModel,
    storage_column: &str,
) -> Result<&'a str> {
    let mut names: Vec<&str> = table
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            TableConstraint::ForeignKey {
                name,
                columns,
                target_table,
                target_columns,
                ..
            } if target_table.schema == CORE_SCHEMA_NAME
                && target_table.name == "Descriptor"
                && target_columns.len() == 1
                && target_columns[0] == "DocumentId"
                && columns.len() == 1
                && columns[0] == storage_column =>
            {
                Some(name.as_str())
            }
            _ => None,
        })
        .collect();

    names.sort_unstable();
    names.dedup();

    match names.as_slice() {
        [name] => Ok(*name),
        _ => Err(Error::descriptor_fk_resolution(
            &table.table,
            storage_column,
            names.len(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_relational_core::schema::{
        db::{DbTableName, ReferentialAction},
        JsonPath,
    };

    fn descriptor_fk(name: &str, column: &str) -> TableConstraint {
        TableConstraint::ForeignKey {
            name: name.to_string(),
            columns: vec![column.to_string()],
            target_table: DbTableName::new("dms", "Descriptor"),
            target_columns: vec!["DocumentId".to_string()],
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    #[test]
    fn resolves_the_single_match() {
        let mut table = DbTableModel::new(DbTableName::new("edfi", "Student"), JsonPath::root());
        table.push_constraint(descriptor_fk("FK_Student_Sex", "Sex_DescriptorId"));

        assert_eq!(
            resolve_descriptor_fk_constraint_name(&table, "Sex_DescriptorId").unwrap(),
            "FK_Student_Sex"
        );
    }

    #[test]
    fn zero_and_several_matches_fail() {
        let mut table = DbTableModel::new(DbTableName::new("edfi", "Student"), JsonPath::root());

        let err = resolve_descriptor_fk_constraint_name(&table, "Sex_DescriptorId").unwrap_err();
        assert!(err.is_descriptor_fk_resolution());
        assert_eq!(
            err.to_string(),
            "Expected descriptor FK constraint for table 'edfi.Student' storage column \
             'Sex_DescriptorId', but none were found."
        );

        table.push_constraint(descriptor_fk("FK_Student_Sex", "Sex_DescriptorId"));
        table.push_constraint(descriptor_fk("FK_Student_Sex_2", "Sex_DescriptorId"));

        let err = resolve_descriptor_fk_constraint_name(&table, "Sex_DescriptorId").unwrap_err();
        assert!(err.to_string().ends_with("but found 2."));
    }

    #[test]
    fn only_the_shared_descriptor_table_counts() {
        let mut table = DbTableModel::new(DbTableName::new("edfi", "Student"), JsonPath::root());
        table.push_constraint(TableConstraint::ForeignKey {
            name: "FK_Student_Sex".to_string(),
            columns: vec!["Sex_DescriptorId".to_string()],
            target_table: DbTableName::new("sample", "Descriptor"),
            target_columns: vec!["DocumentId".to_string()],
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        });

        let err = resolve_descriptor_fk_constraint_name(&table, "Sex_DescriptorId").unwrap_err();
        assert!(err.is_descriptor_fk_resolution());
        assert!(err.to_string().ends_with("but none were found."));

        table.push_constraint(descriptor_fk("FK_Student_Sex_Shared", "Sex_DescriptorId"));
        assert_eq!(
            resolve_descriptor_fk_constraint_name(&table, "Sex_DescriptorId").unwrap(),
            "FK_Student_Sex_Shared"
        );
    }
}
