#![allow(dead_code)]

use dms_relational_core::{
    effective::EffectiveProjectSchema,
    schema::{
        db::{ConcreteResourceModel, DbTableModel},
        DerivedRelationalModelSet, PgsqlDialectRules, QualifiedResourceName, SqlDialect,
    },
    EffectiveSchemaSet, Result,
};
use serde_json::{json, Value};

pub fn ed_fi(resource_schemas: Value) -> EffectiveProjectSchema {
    project("ed-fi", "Ed-Fi", false, resource_schemas)
}

pub fn project(
    endpoint: &str,
    name: &str,
    is_extension: bool,
    resource_schemas: Value,
) -> EffectiveProjectSchema {
    EffectiveProjectSchema {
        project_endpoint_name: endpoint.to_string(),
        project_name: name.to_string(),
        project_version: "5.2.0".to_string(),
        is_extension_project: is_extension,
        project_schema: json!({ "resourceSchemas": resource_schemas }),
    }
}

pub fn build(projects: Vec<EffectiveProjectSchema>) -> Result<DerivedRelationalModelSet> {
    build_set(&EffectiveSchemaSet::from_projects(projects))
}

/// Routes the builder's `log` output through the test harness. Set
/// `RUST_LOG=debug` to see pass progress.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn build_set(effective: &EffectiveSchemaSet) -> Result<DerivedRelationalModelSet> {
    init_logging();
    DerivedRelationalModelSet::builder().build(effective, SqlDialect::Pgsql, &PgsqlDialectRules)
}

pub fn resource<'a>(set: &'a DerivedRelationalModelSet, name: &str) -> &'a ConcreteResourceModel {
    let (project, resource) = name.split_once(':').unwrap();
    set.resource(&QualifiedResourceName::new(project, resource))
        .unwrap_or_else(|| panic!("resource {name} was not derived"))
}

pub fn table<'a>(model: &'a ConcreteResourceModel, name: &str) -> &'a DbTableModel {
    model
        .relational_model
        .tables
        .iter()
        .find(|table| table.table.name == name)
        .unwrap_or_else(|| panic!("table {name} missing from {}", model.resource()))
}

pub fn column_names(table: &DbTableModel) -> Vec<&str> {
    table.columns.iter().map(|column| column.name.as_str()).collect()
}

pub fn constraint_names(table: &DbTableModel) -> Vec<&str> {
    table
        .constraints
        .iter()
        .map(|constraint| constraint.name())
        .collect()
}

fn reference(resource_name: &str, paths: &[(&str, &str)]) -> Value {
    let reference_json_paths: Vec<Value> = paths
        .iter()
        .map(|(identity, reference)| {
            json!({ "identityJsonPath": identity, "referenceJsonPath": reference })
        })
        .collect();

    json!({
        "isReference": true,
        "isDescriptor": false,
        "isRequired": true,
        "projectName": "Ed-Fi",
        "resourceName": resource_name,
        "referenceJsonPaths": reference_json_paths
    })
}

fn descriptor(resource_name: &str, path: &str) -> Value {
    json!({
        "isReference": true,
        "isDescriptor": true,
        "projectName": "Ed-Fi",
        "resourceName": resource_name,
        "path": path
    })
}

fn scalar(path: &str) -> Value {
    json!({ "isReference": false, "path": path })
}

// ---------------------------------------------------------------------------
// Ed-Fi resources
// ---------------------------------------------------------------------------

pub fn school() -> Value {
    json!({
        "resourceName": "School",
        "identityJsonPaths": ["$.schoolId"],
        "documentPathsMapping": {
            "SchoolId": scalar("$.schoolId")
        },
        "jsonSchemaForInsert": {
            "type": "object",
            "required": ["schoolId", "nameOfInstitution"],
            "properties": {
                "schoolId": { "type": "integer" },
                "nameOfInstitution": { "type": "string", "maxLength": 75 }
            }
        }
    })
}

pub fn session() -> Value {
    json!({
        "resourceName": "Session",
        "identityJsonPaths": ["$.schoolReference.schoolId", "$.sessionName"],
        "documentPathsMapping": {
            "School": reference("School", &[("$.schoolId", "$.schoolReference.schoolId")]),
            "SessionName": scalar("$.sessionName")
        },
        "jsonSchemaForInsert": {
            "type": "object",
            "required": ["schoolReference", "sessionName"],
            "properties": {
                "schoolReference": {
                    "type": "object",
                    "required": ["schoolId"],
                    "properties": { "schoolId": { "type": "integer" } }
                },
                "sessionName": { "type": "string", "maxLength": 60 }
            }
        }
    })
}

/// References both `School` and `Session`; the two school ids are declared
/// equal.
pub fn course_offering() -> Value {
    json!({
        "resourceName": "CourseOffering",
        "identityJsonPaths": ["$.localCourseCode"],
        "documentPathsMapping": {
            "LocalCourseCode": scalar("$.localCourseCode"),
            "School": reference("School", &[("$.schoolId", "$.schoolReference.schoolId")]),
            "Session": reference("Session", &[
                ("$.schoolReference.schoolId", "$.sessionReference.schoolId"),
                ("$.sessionName", "$.sessionReference.sessionName"),
            ])
        },
        "equalityConstraints": [
            {
                "sourceJsonPath": "$.schoolReference.schoolId",
                "targetJsonPath": "$.sessionReference.schoolId"
            }
        ],
        "jsonSchemaForInsert": {
            "type": "object",
            "required": ["localCourseCode", "schoolReference", "sessionReference"],
            "properties": {
                "localCourseCode": { "type": "string", "maxLength": 60 },
                "schoolReference": {
                    "type": "object",
                    "required": ["schoolId"],
                    "properties": { "schoolId": { "type": "integer" } }
                },
                "sessionReference": {
                    "type": "object",
                    "required": ["schoolId", "sessionName"],
                    "properties": {
                        "schoolId": { "type": "integer" },
                        "sessionName": { "type": "string", "maxLength": 60 }
                    }
                }
            }
        }
    })
}

pub fn grade_level_descriptor() -> Value {
    json!({
        "resourceName": "GradeLevelDescriptor",
        "isDescriptor": true
    })
}

/// Two descriptor paths into `GradeLevelDescriptor`, declared equal.
pub fn student() -> Value {
    json!({
        "resourceName": "Student",
        "identityJsonPaths": ["$.studentUniqueId"],
        "documentPathsMapping": {
            "StudentUniqueId": scalar("$.studentUniqueId"),
            "EntryGradeLevelDescriptor":
                descriptor("GradeLevelDescriptor", "$.entryGradeLevelDescriptor"),
            "ExitGradeLevelDescriptor":
                descriptor("GradeLevelDescriptor", "$.exitGradeLevelDescriptor")
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
    })
}

/// A collection of scores, unique by subject.
pub fn assessment_result() -> Value {
    json!({
        "resourceName": "AssessmentResult",
        "identityJsonPaths": ["$.resultIdentifier"],
        "documentPathsMapping": {
            "ResultIdentifier": scalar("$.resultIdentifier")
        },
        "arrayUniquenessConstraints": [
            { "paths": ["$.scores[*].subject"] }
        ],
        "jsonSchemaForInsert": {
            "type": "object",
            "required": ["resultIdentifier"],
            "properties": {
                "resultIdentifier": { "type": "string", "maxLength": 60 },
                "scores": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["subject"],
                        "properties": {
                            "subject": { "type": "string", "maxLength": 60 },
                            "score": { "type": "integer" }
                        }
                    }
                }
            }
        }
    })
}

/// Every core fixture resource, keyed the way ApiSchema keys them.
pub fn core_resources() -> Value {
    json!({
        "assessmentResults": assessment_result(),
        "courseOfferings": course_offering(),
        "gradeLevelDescriptors": grade_level_descriptor(),
        "schools": school(),
        "sessions": session(),
        "students": student()
    })
}

// ---------------------------------------------------------------------------
// Extension resources
// ---------------------------------------------------------------------------

/// Extends `Student` with one optional property under `_ext.{key}`.
pub fn student_extension(key: &str) -> Value {
    let mut projects = serde_json::Map::new();
    projects.insert(
        key.to_string(),
        json!({
            "type": "object",
            "properties": {
                "petPreference": { "type": "string", "maxLength": 30 }
            }
        }),
    );

    json!({
        "resourceName": "Student",
        "isResourceExtension": true,
        "jsonSchemaForInsert": {
            "type": "object",
            "properties": {
                "_ext": { "type": "object", "properties": projects }
            }
        }
    })
}
