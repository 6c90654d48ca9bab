mod support;

use dms_relational_core::schema::db::{ColumnKind, ExtensionSite};
use dms_relational_core::schema::JsonPath;
use pretty_assertions::assert_eq;
use serde_json::json;
use std_util::prelude::*;
use support::*;

fn core() -> dms_relational_core::effective::EffectiveProjectSchema {
    ed_fi(json!({
        "gradeLevelDescriptors": grade_level_descriptor(),
        "students": student()
    }))
}

#[test]
fn extension_fields_land_in_an_extension_table() {
    let set = assert_ok!(build(vec![
        core(),
        project("sample", "Sample", true, json!({ "students": student_extension("sample") })),
    ]));

    let model = resource(&set, "Ed-Fi:Student");
    let extension = table(model, "StudentExtension");

    assert_eq!(extension.table.schema, "sample");
    assert_eq!(extension.scope.canonical(), "$._ext.sample");
    assert_eq!(extension.key_column_names(), ["DocumentId"]);
    assert_eq!(column_names(extension), ["DocumentId", "PetPreference"]);

    let pet = extension.column("PetPreference").unwrap();
    assert_eq!(pet.kind, ColumnKind::Scalar);
    assert!(pet.nullable);
    assert_eq!(pet.source_path.as_ref().map(JsonPath::canonical), Some("$._ext.sample.petPreference"));

    assert_eq!(
        model.extension_sites,
        vec![ExtensionSite {
            owning_scope: JsonPath::root(),
            extension_path: JsonPath::compile("$._ext").unwrap(),
            project_keys: vec!["sample".to_string()],
        }]
    );

    // Extension resources own no model of their own
    assert!(set
        .resource(&dms_relational_core::schema::QualifiedResourceName::new("Sample", "Student"))
        .is_none());
}

#[test]
fn project_keys_match_case_insensitively() {
    let set = assert_ok!(build(vec![
        core(),
        project("sample", "Sample", true, json!({ "students": student_extension("Sample") })),
    ]));

    let model = resource(&set, "Ed-Fi:Student");
    assert_eq!(model.extension_sites[0].project_keys, ["Sample"]);
    assert_eq!(table(model, "StudentExtension").table.schema, "sample");
}

#[test]
fn ambiguous_project_key_names_every_candidate() {
    let err = assert_err_contains!(
        build(vec![
            core(),
            project("sample-one", "Sample", true, json!({ "students": student_extension("sample") })),
            project("sample-two", "Sample", true, json!({})),
        ]),
        "Extension project key 'sample' matches multiple configured projects by project name",
        "sample-one (Sample); sample-two (Sample)",
        "resource 'Ed-Fi:Student', owning scope '$', extension path '$._ext'",
    );

    assert!(err.is_unresolved_extension_project());
}

#[test]
fn unknown_project_key_is_rejected() {
    let err = assert_err_contains!(
        build(vec![
            core(),
            project("sample", "Sample", true, json!({ "students": student_extension("tpdm") })),
        ]),
        "Extension project key 'tpdm' does not match any configured project",
    );

    assert!(err.is_unresolved_extension_project());
}

#[test]
fn core_project_key_is_not_an_extension() {
    let err = assert_err_contains!(
        build(vec![
            core(),
            project("sample", "Sample", true, json!({ "students": student_extension("ed-fi") })),
        ]),
        "resolves to non-extension project 'ed-fi' (Ed-Fi)",
    );

    assert!(err.is_unresolved_extension_project());
}

#[test]
fn extension_without_a_core_resource_is_rejected() {
    assert_err_contains!(
        build(vec![
            ed_fi(json!({ "schools": school() })),
            project("sample", "Sample", true, json!({ "students": student_extension("sample") })),
        ]),
        "Extension resource 'Sample:Student' does not extend any core resource",
    );
}
