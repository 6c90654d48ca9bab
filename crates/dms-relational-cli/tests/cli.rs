use dms_relational_cli::{load_effective_schema, Config, DmsRelationalCli, ManifestConfig};
use dms_relational_core::schema::SqlDialect;
use serde_json::json;
use std::{fs, path::PathBuf};
use std_util::prelude::*;

/// A fresh scratch directory under the system temp dir.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("dms-relational-cli-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn api_schema() -> serde_json::Value {
    json!({
        "projectSchema": {
            "projectEndpointName": "ed-fi",
            "projectName": "Ed-Fi",
            "projectVersion": "5.2.0",
            "isExtensionProject": false,
            "resourceSchemas": {
                "gradeLevelDescriptors": {
                    "resourceName": "GradeLevelDescriptor",
                    "isDescriptor": true
                },
                "schools": {
                    "resourceName": "School",
                    "identityJsonPaths": ["$.schoolId"],
                    "documentPathsMapping": {
                        "SchoolId": { "isReference": false, "path": "$.schoolId" }
                    },
                    "jsonSchemaForInsert": {
                        "type": "object",
                        "required": ["schoolId"],
                        "properties": { "schoolId": { "type": "integer" } }
                    }
                }
            }
        }
    })
}

fn write_api_schema(dir: &PathBuf) -> PathBuf {
    let path = dir.join("ApiSchema.json");
    fs::write(&path, serde_json::to_string_pretty(&api_schema()).unwrap()).unwrap();
    path
}

#[test]
fn api_schema_files_become_projects() {
    let dir = scratch("load");
    let path = write_api_schema(&dir);

    let effective = assert_ok!(load_effective_schema(&[&path]));
    assert_eq!(effective.projects.len(), 1);

    let project = &effective.projects[0];
    assert_eq!(project.project_endpoint_name, "ed-fi");
    assert_eq!(project.project_name, "Ed-Fi");
    assert!(!project.is_extension_project);
    assert!(effective.effective_schema.resource_keys.is_empty());
}

#[test]
fn unreadable_input_names_the_file() {
    let dir = scratch("missing");
    let path = dir.join("nope.json");

    let err = assert_err!(load_effective_schema(&[&path]));
    assert!(err.to_string().contains("nope.json"), "{err}");
}

#[test]
fn manifest_command_writes_set_and_resource_manifests() {
    let dir = scratch("manifest");
    let input = write_api_schema(&dir);
    let output = dir.join("out");

    let config = Config::new()
        .dialect(SqlDialect::Mssql)
        .manifest(ManifestConfig::new().output_dir(&output));
    assert_ok!(DmsRelationalCli::with_config(config).parse_from([
        "dms-relational".into(),
        "manifest".into(),
        input.into_os_string(),
    ]));

    let set = fs::read_to_string(output.join("relational-model.manifest.json")).unwrap();
    assert!(set.contains("\"dialect\": \"Mssql\""), "{set}");

    let school = fs::read_to_string(output.join("ed_fi").join("school.manifest.json")).unwrap();
    assert!(school.ends_with('\n'));
    assert!(school.contains("\"storage_kind\": \"RelationalTables\""));

    assert!(output
        .join("ed_fi")
        .join("grade_level_descriptor.manifest.json")
        .exists());
}

#[test]
fn per_resource_manifests_can_be_disabled() {
    let dir = scratch("set-only");
    let input = write_api_schema(&dir);
    let output = dir.join("out");

    let config = Config::new().manifest(
        ManifestConfig::new()
            .output_dir(&output)
            .per_resource(false),
    );
    assert_ok!(DmsRelationalCli::with_config(config).parse_from([
        "dms-relational".into(),
        "manifest".into(),
        input.into_os_string(),
    ]));

    assert!(output.join("relational-model.manifest.json").exists());
    assert!(!output.join("ed_fi").exists());
}
