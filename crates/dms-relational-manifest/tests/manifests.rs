use dms_relational_core::{
    effective::EffectiveProjectSchema,
    schema::{DerivedRelationalModelSet, PgsqlDialectRules, QualifiedResourceName, SqlDialect},
    EffectiveSchemaSet,
};
use dms_relational_manifest::{
    emit_resource_manifest, emit_set_manifest, emit_set_manifest_with_details,
    resolve_descriptor_fk_constraint_name,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std_util::prelude::*;

fn ed_fi() -> EffectiveProjectSchema {
    EffectiveProjectSchema {
        project_endpoint_name: "ed-fi".to_string(),
        project_name: "Ed-Fi".to_string(),
        project_version: "5.2.0".to_string(),
        is_extension_project: false,
        project_schema: json!({
            "resourceSchemas": {
                "gradeLevelDescriptors": {
                    "resourceName": "GradeLevelDescriptor",
                    "isDescriptor": true
                },
                "students": {
                    "resourceName": "Student",
                    "identityJsonPaths": ["$.studentUniqueId"],
                    "documentPathsMapping": {
                        "StudentUniqueId": { "isReference": false, "path": "$.studentUniqueId" },
                        "EntryGradeLevelDescriptor": {
                            "isReference": true,
                            "isDescriptor": true,
                            "projectName": "Ed-Fi",
                            "resourceName": "GradeLevelDescriptor",
                            "path": "$.entryGradeLevelDescriptor"
                        },
                        "ExitGradeLevelDescriptor": {
                            "isReference": true,
                            "isDescriptor": true,
                            "projectName": "Ed-Fi",
                            "resourceName": "GradeLevelDescriptor",
                            "path": "$.exitGradeLevelDescriptor"
                        }
                    },
                    "equalityConstraints": [
                        {
                            "sourceJsonPath": "$.entryGradeLevelDescriptor",
                            "targetJsonPath": "$.exitGradeLevelDescriptor"
                        }
                    ],
                    "jsonSchemaForInsert": {
                        "type": "object",
                        "required": [
                            "studentUniqueId",
                            "entryGradeLevelDescriptor",
                            "exitGradeLevelDescriptor"
                        ],
                        "properties": {
                            "studentUniqueId": { "type": "string", "maxLength": 32 },
                            "entryGradeLevelDescriptor": { "type": "string", "maxLength": 306 },
                            "exitGradeLevelDescriptor": { "type": "string", "maxLength": 306 }
                        }
                    }
                }
            }
        }),
    }
}

fn build() -> DerivedRelationalModelSet {
    assert_ok!(DerivedRelationalModelSet::builder().build(
        &EffectiveSchemaSet::from_projects(vec![ed_fi()]),
        SqlDialect::Pgsql,
        &PgsqlDialectRules,
    ))
}

fn resource_manifest(set: &DerivedRelationalModelSet, name: &str) -> String {
    let model = set
        .resource(&QualifiedResourceName::new("Ed-Fi", name))
        .unwrap();
    assert_ok!(emit_resource_manifest(
        &model.relational_model,
        &model.extension_sites
    ))
}

fn parse(manifest: &str) -> Value {
    assert_ok!(serde_json::from_str(manifest))
}

#[test]
fn equal_models_emit_identical_bytes() {
    let first = build();
    let second = build();

    assert_eq!(
        resource_manifest(&first, "Student"),
        resource_manifest(&second, "Student")
    );
    assert_eq!(
        assert_ok!(emit_set_manifest(&first)),
        assert_ok!(emit_set_manifest(&second))
    );
}

#[test]
fn resource_manifest_layout() {
    let manifest = resource_manifest(&build(), "Student");

    assert!(manifest.ends_with("}\n"));
    assert!(manifest.starts_with(
        "{\n  \"resource\": {\n    \"project_name\": \"Ed-Fi\",\n    \"resource_name\": \"Student\"\n  },\n  \"physical_schema\": \"edfi\",\n"
    ));

    let value = parse(&manifest);
    assert_eq!(value["storage_kind"], "RelationalTables");

    let table = &value["tables"][0];
    assert_eq!(table["name"], "Student");
    assert_eq!(table["scope"], "$");
    assert_eq!(
        table["key_columns"],
        json!([{ "name": "DocumentId", "kind": "ParentKeyPart" }])
    );
}

#[test]
fn unified_descriptor_columns_render_their_storage() {
    let value = parse(&resource_manifest(&build(), "Student"));
    let table = &value["tables"][0];

    let entry = table["columns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|column| column["name"] == "EntryGradeLevelDescriptor_DescriptorId")
        .unwrap();
    assert_eq!(
        entry["storage"],
        json!({
            "kind": "UnifiedAlias",
            "canonical_column": "EntryGradeLevelDescriptor_Unified_DescriptorId",
            "presence_column": null
        })
    );

    assert_eq!(
        table["descriptor_fk_deduplications"],
        json!([{
            "storage_column": "EntryGradeLevelDescriptor_Unified_DescriptorId",
            "binding_columns": [
                "EntryGradeLevelDescriptor_DescriptorId",
                "ExitGradeLevelDescriptor_DescriptorId"
            ],
            "constraint_name": "FK_Student_EntryGradeLevelDescriptor_Unified"
        }])
    );
}

#[test]
fn descriptor_fk_name_resolves_from_the_model() {
    let set = build();
    let model = set
        .resource(&QualifiedResourceName::new("Ed-Fi", "Student"))
        .unwrap();
    let root = model.relational_model.root_table().unwrap();

    assert_eq!(
        assert_ok!(resolve_descriptor_fk_constraint_name(
            root,
            "EntryGradeLevelDescriptor_Unified_DescriptorId"
        )),
        "FK_Student_EntryGradeLevelDescriptor_Unified"
    );

    // The alias column carries no constraint of its own
    let err = assert_err!(resolve_descriptor_fk_constraint_name(
        root,
        "EntryGradeLevelDescriptor_DescriptorId"
    ));
    assert!(err.is_descriptor_fk_resolution());
}

#[test]
fn descriptor_resources_list_no_tables() {
    let value = parse(&resource_manifest(&build(), "GradeLevelDescriptor"));

    assert_eq!(value["storage_kind"], "SharedDescriptorTable");
    assert_eq!(value["tables"], json!([]));
}

#[test]
fn set_manifest_summarizes_the_build() {
    let value = parse(&assert_ok!(emit_set_manifest(&build())));

    assert_eq!(value["dialect"], "Pgsql");
    assert_eq!(
        value["projects"],
        json!([{
            "project_endpoint_name": "ed-fi",
            "project_name": "Ed-Fi",
            "project_version": "5.2.0",
            "is_extension": false,
            "physical_schema": "edfi"
        }])
    );

    let resources: Vec<(&str, i64)> = value["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|resource| {
            (
                resource["resource_name"].as_str().unwrap(),
                resource["resource_key_id"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(resources, [("GradeLevelDescriptor", 1), ("Student", 2)]);

    assert!(value.get("resource_details").is_none());
}

#[test]
fn set_manifest_details_cover_selected_resources() {
    let set = build();
    let detailed = BTreeSet::from([QualifiedResourceName::new("Ed-Fi", "Student")]);

    let value = parse(&assert_ok!(emit_set_manifest_with_details(&set, &detailed)));
    let details = value["resource_details"].as_array().unwrap();

    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["resource"]["resource_name"], "Student");
    assert_eq!(details[0]["tables"][0]["name"], "Student");
    assert_eq!(
        details[0]["descriptor_edge_sources"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}
