mod support;

use dms_relational_core::{
    effective::{EffectiveProjectSchema, EffectiveSchemaInfo, ResourceKeyEntry},
    schema::{db::TableConstraint, DerivedRelationalModelSet, NameScope, SqlDialect, SqlDialectRules},
    EffectiveSchemaSet,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std_util::prelude::*;
use support::*;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn project_schema_must_declare_resource_schemas() {
    let mut project = ed_fi(json!({}));
    project.project_schema = json!({ "projectName": "Ed-Fi" });

    let err = assert_err_contains!(
        build(vec![project]),
        "Expected projectSchema.resourceSchemas to be present for project 'ed-fi'",
    );
    assert!(err.is_invalid_schema());
}

#[test]
fn endpoint_names_are_unique() {
    assert_err_contains!(
        build(vec![ed_fi(json!({ "schools": school() })), ed_fi(json!({}))]),
        "Project endpoint name 'ed-fi' is declared more than once",
    );
}

#[test]
fn physical_schema_names_are_unique() {
    assert_err_contains!(
        build(vec![
            ed_fi(json!({ "schools": school() })),
            project("EdFi", "Other", true, json!({})),
        ]),
        "Physical schema name 'edfi' is derived from both 'EdFi' and 'ed-fi'",
    );
}

#[test]
fn references_must_target_declared_resources() {
    assert_err_contains!(
        build(vec![ed_fi(json!({ "sessions": session() }))]),
        "documentPathsMapping entry 'School' on resource 'Ed-Fi:Session' targets unknown \
         resource 'Ed-Fi:School'",
    );
}

#[test]
fn identity_paths_must_be_mapped() {
    let mut school = school();
    school["documentPathsMapping"] = json!({});

    assert_err_contains!(
        build(vec![ed_fi(json!({ "schools": school }))]),
        "identityJsonPaths on resource 'Ed-Fi:School' were not found in documentPathsMapping: \
         $.schoolId.",
    );
}

#[test]
fn identity_columns_must_not_be_nullable() {
    let mut student = student();
    student["jsonSchemaForInsert"]["required"] =
        json!(["entryGradeLevelDescriptor", "exitGradeLevelDescriptor"]);

    let err = assert_err_contains!(
        build(vec![ed_fi(json!({
            "gradeLevelDescriptors": grade_level_descriptor(),
            "students": student
        }))]),
        "set pass BaseTraversalAndDescriptorBinding failed",
        "deriving tables for resource 'Ed-Fi:Student'",
        "Identity path '$.studentUniqueId' on resource 'Ed-Fi:Student' maps to nullable column \
         'StudentUniqueId'",
    );
    assert!(err.is_invalid_schema());
}

fn with_resource_keys(keys: Vec<(i16, &str)>) -> EffectiveSchemaSet {
    EffectiveSchemaSet {
        effective_schema: EffectiveSchemaInfo {
            resource_keys: keys
                .into_iter()
                .map(|(id, name)| ResourceKeyEntry {
                    resource_key_id: id,
                    project_name: "Ed-Fi".to_string(),
                    resource_name: name.to_string(),
                    resource_version: "5.2.0".to_string(),
                    is_abstract_resource: false,
                })
                .collect(),
            ..EffectiveSchemaInfo::default()
        },
        projects: vec![ed_fi(json!({ "schools": school(), "sessions": session() }))],
    }
}

#[test]
fn declared_resource_keys_are_checked() {
    assert_err_contains!(
        build_set(&with_resource_keys(vec![(1, "School")])),
        "Effective schema resource key missing for resource 'Ed-Fi:Session'",
    );

    assert_err_contains!(
        build_set(&with_resource_keys(vec![(1, "School"), (1, "Session")])),
        "Resource key id 1 is assigned more than once",
    );

    assert_err_contains!(
        build_set(&with_resource_keys(vec![(1, "School"), (2, "Session"), (3, "Staff")])),
        "Resource key 3 references unknown resource 'Ed-Fi:Staff'",
    );

    assert_ok!(build_set(&with_resource_keys(vec![(10, "School"), (20, "Session")])));
}

// ---------------------------------------------------------------------------
// Name overrides
// ---------------------------------------------------------------------------

fn student_with_overrides(overrides: Value) -> Vec<EffectiveProjectSchema> {
    let mut student = student();
    student["relational"] = json!({ "nameOverrides": overrides });

    vec![ed_fi(json!({
        "gradeLevelDescriptors": grade_level_descriptor(),
        "students": student
    }))]
}

#[test]
fn column_override_renames_the_column_and_its_key() {
    let set = assert_ok!(build(student_with_overrides(json!({
        "$.studentUniqueId": "UniqueId"
    }))));

    let root = table(resource(&set, "Ed-Fi:Student"), "Student");
    assert!(root.has_column("UniqueId"));
    assert!(!root.has_column("StudentUniqueId"));

    let key = root.constraint("UX_Student_NK").unwrap();
    assert_eq!(
        key,
        &TableConstraint::Unique {
            name: "UX_Student_NK".to_string(),
            columns: vec!["UniqueId".to_string()],
        }
    );
}

#[test]
fn unused_overrides_fail_the_build() {
    let err = assert_err!(build(student_with_overrides(json!({
        "$.studentUniqueId": "UniqueId",
        "$.nickname": "Alias"
    }))));

    assert!(err.is_unused_name_override());
    assert_eq!(
        err.to_string(),
        "relational.nameOverrides entries did not match any derived columns or collection scopes \
         on resource 'Ed-Fi:Student': '$.nickname' (canonical '$.nickname')"
    );
}

fn course_offering_with_overrides(overrides: Value) -> Vec<EffectiveProjectSchema> {
    let mut course_offering = course_offering();
    course_offering["relational"] = json!({ "nameOverrides": overrides });

    vec![ed_fi(json!({
        "courseOfferings": course_offering,
        "schools": school(),
        "sessions": session()
    }))]
}

#[test]
fn reference_overrides_rename_the_reference_columns() {
    let set = assert_ok!(build(course_offering_with_overrides(json!({
        "$.sessionReference": "Term",
        "$.sessionReference.sessionName": "Name"
    }))));

    let root = table(resource(&set, "Ed-Fi:CourseOffering"), "CourseOffering");
    for column in ["Term_DocumentId", "Term_SchoolId", "Term_Name"] {
        assert!(root.has_column(column), "missing {column}; columns={:?}", column_names(root));
    }
    assert!(root.constraint("FK_CourseOffering_Term").is_some());
    assert!(root.constraint("CK_CourseOffering_Term_AllNone").is_some());
}

#[test]
fn overrides_inside_a_reference_must_target_identity_parts() {
    let err = assert_err_contains!(
        build(course_offering_with_overrides(json!({
            "$.sessionReference.link": "Href"
        }))),
        "relational.nameOverrides entry '$.sessionReference.link'",
        "only reference identity paths may be overridden",
    );
    assert!(err.is_invalid_schema());
}

// ---------------------------------------------------------------------------
// Identifier shortening
// ---------------------------------------------------------------------------

/// Plain truncation with no hash suffix, so distinct names can collide.
#[derive(Debug)]
struct TruncatingRules;

impl SqlDialectRules for TruncatingRules {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Pgsql
    }

    fn max_identifier_length(&self) -> usize {
        20
    }

    fn index_name_scope(&self) -> NameScope {
        NameScope::Schema
    }

    fn trigger_name_scope(&self) -> NameScope {
        NameScope::Table
    }

    fn allows_cascading_updates(&self) -> bool {
        true
    }

    fn shorten_identifier(&self, name: &str) -> String {
        name.chars().take(self.max_identifier_length()).collect()
    }
}

fn learner(properties: Value) -> Vec<EffectiveProjectSchema> {
    let mut all = json!({ "learnerId": { "type": "string", "maxLength": 32 } });
    for (name, schema) in properties.as_object().unwrap() {
        all[name] = schema.clone();
    }

    vec![ed_fi(json!({
        "learners": {
            "resourceName": "Learner",
            "identityJsonPaths": ["$.learnerId"],
            "documentPathsMapping": {
                "LearnerId": { "isReference": false, "path": "$.learnerId" }
            },
            "jsonSchemaForInsert": {
                "type": "object",
                "required": ["learnerId"],
                "properties": all
            }
        }
    }))]
}

fn build_truncated(
    projects: Vec<EffectiveProjectSchema>,
) -> dms_relational_core::Result<DerivedRelationalModelSet> {
    init_logging();
    DerivedRelationalModelSet::builder().build(
        &EffectiveSchemaSet::from_projects(projects),
        SqlDialect::Pgsql,
        &TruncatingRules,
    )
}

#[test]
fn names_shortening_alike_are_reported_together() {
    let err = assert_err!(build_truncated(learner(json!({
        "assessmentIdentifierPrimary": { "type": "string", "maxLength": 60 },
        "assessmentIdentifierSecondary": { "type": "string", "maxLength": 60 }
    }))));

    assert!(err.is_identifier_collision());
    assert_eq!(
        err.to_string(),
        "Identifier shortening collisions detected: column edfi.Learner 'AssessmentIdentifier' \
         <= [AssessmentIdentifierPrimary, AssessmentIdentifierSecondary]"
    );
}

#[test]
fn short_names_pass_through_truncating_rules() {
    let set = assert_ok!(build_truncated(learner(json!({
        "nickname": { "type": "string", "maxLength": 60 }
    }))));

    let triggers: Vec<&str> = set
        .triggers_in_create_order
        .iter()
        .map(|trigger| trigger.name.as_str())
        .collect();
    assert_eq!(triggers, ["TR_Learner_Referenti", "TR_Learner_Stamp"]);
}

#[test]
fn index_names_must_be_unique_in_their_scope() {
    let scores = json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": { "value": { "type": "integer" } }
        }
    });

    let err = assert_err!(build_truncated(learner(json!({
        "assessmentScores": scores.clone(),
        "assessmentScoreHistories": scores
    }))));

    assert!(err.is_uniqueness_violation());
    assert!(
        err.to_string().contains("duplicate index name 'PK_LearnerAssessment'"),
        "{err}"
    );
}
