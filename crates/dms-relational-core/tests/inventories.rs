mod support;

use dms_relational_core::schema::{
    db::{DbIndexInfo, DbTableName, DbTriggerInfo, IndexKind, TableConstraint, TriggerKind},
    DerivedRelationalModelSet,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std_util::prelude::*;
use support::*;

fn full_set() -> DerivedRelationalModelSet {
    assert_ok!(build(vec![
        ed_fi(core_resources()),
        project("sample", "Sample", true, json!({ "students": student_extension("sample") })),
    ]))
}

fn indexes_on<'a>(set: &'a DerivedRelationalModelSet, table: &str) -> Vec<&'a DbIndexInfo> {
    set.indexes_in_create_order
        .iter()
        .filter(|index| index.table.to_string() == table)
        .collect()
}

fn triggers_on<'a>(set: &'a DerivedRelationalModelSet, table: &str) -> Vec<&'a DbTriggerInfo> {
    set.triggers_in_create_order
        .iter()
        .filter(|trigger| trigger.table.to_string() == table)
        .collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn every_table_has_a_primary_key_index() {
    let set = full_set();

    for model in &set.concrete_resources_in_name_order {
        for table in &model.relational_model.tables {
            let pk = format!("PK_{}", table.table.name);
            let index = set
                .indexes_in_create_order
                .iter()
                .find(|index| index.table == table.table && index.name == pk)
                .unwrap_or_else(|| panic!("{pk} missing on {}", table.table));

            assert_eq!(index.kind, IndexKind::PrimaryKey);
            assert!(index.is_unique);
            assert_eq!(index.columns, table.key_column_names());
        }
    }
}

#[test]
fn unique_constraints_are_backed_by_indexes() {
    let set = full_set();

    for model in &set.concrete_resources_in_name_order {
        for table in &model.relational_model.tables {
            for constraint in &table.constraints {
                let TableConstraint::Unique { name, columns } = constraint else {
                    continue;
                };

                let index = set
                    .indexes_in_create_order
                    .iter()
                    .find(|index| &index.name == name)
                    .unwrap_or_else(|| panic!("no index for {name}"));
                assert_eq!(index.kind, IndexKind::UniqueConstraint);
                assert!(index.is_unique);
                assert_eq!(&index.columns, columns);
            }
        }
    }
}

#[test]
fn uncovered_foreign_keys_get_support_indexes() {
    let set = full_set();

    let names: Vec<&str> = indexes_on(&set, "edfi.Student")
        .iter()
        .map(|index| index.name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "IX_Student_EntryGradeLevelDescriptor_Unified_DescriptorId",
            "PK_Student",
            "UX_Student_NK",
        ]
    );

    let session = indexes_on(&set, "edfi.Session");
    let support = session
        .iter()
        .find(|index| index.kind == IndexKind::ForeignKeySupport)
        .unwrap();
    assert_eq!(support.name, "IX_Session_School_DocumentId_SchoolId");
    assert_eq!(support.columns, strings(&["School_DocumentId", "School_SchoolId"]));
    assert!(!support.is_unique);
}

#[test]
fn foreign_keys_leading_a_key_need_no_index() {
    let set = full_set();

    // The parent FK is the first key column of the collection table
    let names: Vec<&str> = indexes_on(&set, "edfi.AssessmentResultScore")
        .iter()
        .map(|index| index.name.as_str())
        .collect();
    assert_eq!(names, ["PK_AssessmentResultScore", "UX_AssessmentResultScore_Subject"]);
}

#[test]
fn descriptor_resources_get_no_inventory() {
    let set = full_set();

    assert!(indexes_on(&set, "dms.Descriptor").is_empty());
    assert!(triggers_on(&set, "dms.Descriptor").is_empty());
}

#[test]
fn roots_stamp_documents_and_maintain_identities() {
    let set = full_set();

    assert_eq!(
        triggers_on(&set, "edfi.Student"),
        [
            &DbTriggerInfo {
                name: "TR_Student_ReferentialIdentity".to_string(),
                table: DbTableName::new("edfi", "Student"),
                kind: TriggerKind::ReferentialIdentityMaintenance,
                key_columns: strings(&["DocumentId"]),
                identity_projection_columns: strings(&["StudentUniqueId"]),
            },
            &DbTriggerInfo {
                name: "TR_Student_Stamp".to_string(),
                table: DbTableName::new("edfi", "Student"),
                kind: TriggerKind::DocumentStamping,
                key_columns: strings(&["DocumentId"]),
                identity_projection_columns: strings(&["StudentUniqueId"]),
            },
        ]
    );
}

#[test]
fn child_and_extension_tables_stamp_their_root_document() {
    let set = full_set();

    let scores = triggers_on(&set, "edfi.AssessmentResultScore");
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].name, "TR_AssessmentResultScore_Stamp");
    assert_eq!(scores[0].kind, TriggerKind::DocumentStamping);
    assert_eq!(scores[0].key_columns, strings(&["AssessmentResult_DocumentId"]));
    assert!(scores[0].identity_projection_columns.is_empty());

    let extension = triggers_on(&set, "sample.StudentExtension");
    assert_eq!(extension.len(), 1);
    assert_eq!(extension[0].name, "TR_StudentExtension_Stamp");
    assert_eq!(extension[0].key_columns, strings(&["DocumentId"]));
    assert!(extension[0].identity_projection_columns.is_empty());
}

#[test]
fn identity_projections_follow_the_natural_key() {
    let set = full_set();

    let course_offering = triggers_on(&set, "edfi.CourseOffering");
    let names: Vec<&str> = course_offering.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["TR_CourseOffering_ReferentialIdentity", "TR_CourseOffering_Stamp"]
    );
    assert_eq!(
        course_offering[0].identity_projection_columns,
        strings(&["LocalCourseCode"])
    );

    // A reference in the identity projects as its document id
    let session = triggers_on(&set, "edfi.Session");
    assert_eq!(
        session[0].identity_projection_columns,
        strings(&["School_DocumentId", "SessionName"])
    );
}
