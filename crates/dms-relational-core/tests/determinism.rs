mod support;

use dms_relational_core::{
    effective::{EffectiveSchemaInfo, ResourceKeyEntry},
    schema::{db::TableConstraintKind, DerivedRelationalModelSet},
    EffectiveSchemaSet,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std_util::prelude::*;
use support::*;

fn projects() -> Vec<dms_relational_core::effective::EffectiveProjectSchema> {
    vec![
        ed_fi(core_resources()),
        project("sample", "Sample", true, json!({ "students": student_extension("sample") })),
    ]
}

fn full_set() -> DerivedRelationalModelSet {
    assert_ok!(build(projects()))
}

#[test]
fn repeated_builds_are_equal() {
    assert_eq!(full_set(), full_set());
}

#[test]
fn project_order_does_not_matter() {
    let mut reversed = projects();
    reversed.reverse();

    assert_eq!(full_set(), assert_ok!(build(reversed)));
}

#[test]
fn declared_resource_key_order_does_not_matter() {
    let assigned = full_set();

    let mut keys: Vec<ResourceKeyEntry> = assigned
        .concrete_resources_in_name_order
        .iter()
        .map(|model| model.resource_key.clone())
        .collect();
    keys.push(ResourceKeyEntry {
        resource_key_id: 7,
        project_name: "Sample".to_string(),
        resource_name: "Student".to_string(),
        resource_version: "5.2.0".to_string(),
        is_abstract_resource: false,
    });
    keys.reverse();

    let effective = EffectiveSchemaSet {
        effective_schema: EffectiveSchemaInfo {
            api_schema_format_version: "1.0.0".to_string(),
            effective_schema_hash: "abc123".to_string(),
            resource_keys: keys,
        },
        projects: projects(),
    };

    let declared = assert_ok!(build_set(&effective));
    assert_eq!(
        declared.concrete_resources_in_name_order,
        assigned.concrete_resources_in_name_order
    );
    assert_eq!(declared.effective_schema.effective_schema_hash, "abc123");
}

// ---------------------------------------------------------------------------
// Canonical ordering
// ---------------------------------------------------------------------------

#[test]
fn projects_and_resources_are_in_name_order() {
    let set = full_set();

    let endpoints: Vec<&str> = set
        .project_schemas_in_endpoint_order
        .iter()
        .map(|info| info.project_endpoint_name.as_str())
        .collect();
    assert_eq!(endpoints, ["ed-fi", "sample"]);

    let names: Vec<String> = set
        .concrete_resources_in_name_order
        .iter()
        .map(|model| model.resource().to_string())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn tables_list_parents_before_children() {
    let set = full_set();
    let model = resource(&set, "Ed-Fi:Student");

    let tables: Vec<String> = model
        .relational_model
        .tables
        .iter()
        .map(|table| table.table.to_string())
        .collect();
    assert_eq!(tables, ["edfi.Student", "sample.StudentExtension"]);
}

#[test]
fn columns_lead_with_keys_then_descriptors_then_scalars() {
    let set = full_set();
    let root = table(resource(&set, "Ed-Fi:CourseOffering"), "CourseOffering");

    assert_eq!(
        column_names(root),
        [
            "DocumentId",
            "LocalCourseCode",
            "SchoolId_Unified",
            "School_SchoolId",
            "Session_SchoolId",
            "Session_SessionName",
            "School_DocumentId",
            "Session_DocumentId",
        ]
    );

    let student = table(resource(&set, "Ed-Fi:Student"), "Student");
    assert_eq!(
        column_names(student),
        [
            "DocumentId",
            "EntryGradeLevelDescriptor_DescriptorId",
            "EntryGradeLevelDescriptor_Unified_DescriptorId",
            "ExitGradeLevelDescriptor_DescriptorId",
            "StudentUniqueId",
        ]
    );
}

#[test]
fn constraints_are_grouped_by_kind_then_name() {
    let set = full_set();

    for model in &set.concrete_resources_in_name_order {
        for table in &model.relational_model.tables {
            let keys: Vec<(TableConstraintKind, &str)> = table
                .constraints
                .iter()
                .map(|constraint| (constraint.kind(), constraint.name()))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted, "constraints of {}", table.table);
        }
    }

    let root = table(resource(&set, "Ed-Fi:CourseOffering"), "CourseOffering");
    assert_eq!(
        constraint_names(root),
        [
            "UX_CourseOffering_NK",
            "FK_CourseOffering_Document",
            "FK_CourseOffering_School",
            "FK_CourseOffering_Session",
            "CK_CourseOffering_School_AllNone",
            "CK_CourseOffering_Session_AllNone",
        ]
    );
}

#[test]
fn inventories_are_in_create_order() {
    let set = full_set();

    let indexes: Vec<(String, &str)> = set
        .indexes_in_create_order
        .iter()
        .map(|index| (index.table.to_string(), index.name.as_str()))
        .collect();
    let mut sorted = indexes.clone();
    sorted.sort();
    assert_eq!(indexes, sorted);

    let triggers: Vec<(String, &str)> = set
        .triggers_in_create_order
        .iter()
        .map(|trigger| (trigger.table.to_string(), trigger.name.as_str()))
        .collect();
    let mut sorted = triggers.clone();
    sorted.sort();
    assert_eq!(triggers, sorted);

    // The extension schema sorts after the core one
    assert_eq!(
        triggers.last().map(|(table, name)| (table.as_str(), *name)),
        Some(("sample.StudentExtension", "TR_StudentExtension_Stamp"))
    );
}
