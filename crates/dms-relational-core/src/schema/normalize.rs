//! Reduces the effective schema set to canonically ordered project contexts
//! and validates cross-resource consistency.

use super::{
    input::{self, AbstractResourceSchema, ResourceSchema},
    name::normalize_schema_name,
    JsonPath, QualifiedResourceName,
};
use crate::{
    effective::{EffectiveSchemaSet, ResourceKeyEntry},
    Error, Result,
};

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Per-project metadata. Owned by the builder context and replaced by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSchemaInfo {
    pub project_endpoint_name: String,
    pub project_name: String,
    pub project_version: String,
    pub is_extension_project: bool,
    pub physical_schema: String,
}

/// A project's parsed schema.
#[derive(Debug, Clone)]
pub struct ProjectSchemaContext {
    pub info: ProjectSchemaInfo,
    /// Keyed by resource name
    pub resources: BTreeMap<String, ResourceSchema>,
    pub abstract_resources: Vec<AbstractResourceSchema>,
}

/// Output of [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedSchemaSet {
    /// Ordered by endpoint name
    pub projects: Vec<ProjectSchemaContext>,
    pub resource_keys: BTreeMap<QualifiedResourceName, ResourceKeyEntry>,
}

impl NormalizedSchemaSet {
    pub fn project_infos(&self) -> Vec<ProjectSchemaInfo> {
        self.projects.iter().map(|project| project.info.clone()).collect()
    }

    pub fn resource(&self, name: &QualifiedResourceName) -> Option<&ResourceSchema> {
        self.projects
            .iter()
            .find(|project| project.info.project_name == name.project_name)?
            .resources
            .get(&name.resource_name)
    }

    pub fn abstract_resource(&self, name: &QualifiedResourceName) -> Option<&AbstractResourceSchema> {
        self.projects
            .iter()
            .filter(|project| project.info.project_name == name.project_name)
            .flat_map(|project| &project.abstract_resources)
            .find(|resource| &resource.resource == name)
    }

    pub fn project_for(&self, name: &QualifiedResourceName) -> Option<&ProjectSchemaContext> {
        self.projects
            .iter()
            .find(|project| project.info.project_name == name.project_name)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&ProjectSchemaContext, &ResourceSchema)> {
        self.projects
            .iter()
            .flat_map(|project| project.resources.values().map(move |schema| (project, schema)))
    }

    /// Identity paths of a concrete or abstract resource.
    pub fn identity_json_paths(&self, name: &QualifiedResourceName) -> Option<&[JsonPath]> {
        if let Some(resource) = self.resource(name) {
            return Some(&resource.identity_json_paths);
        }
        self.abstract_resource(name)
            .map(|resource| resource.identity_json_paths.as_slice())
    }
}

/// Normalizes and validates `effective`.
pub fn normalize(effective: &EffectiveSchemaSet) -> Result<NormalizedSchemaSet> {
    let mut projects = vec![];

    for project in &effective.projects {
        let what = format!("project '{}'", project.project_endpoint_name);
        let schema = match &project.project_schema {
            Value::Object(schema) => schema,
            _ => {
                return Err(Error::invalid_schema(format!(
                    "Expected projectSchema to be an object for {what}"
                )))
            }
        };

        let resource_schemas = match schema.get("resourceSchemas") {
            Some(Value::Object(entries)) => entries,
            None | Some(Value::Null) => {
                return Err(Error::invalid_schema(format!(
                    "Expected projectSchema.resourceSchemas to be present for {what}"
                )))
            }
            Some(_) => {
                return Err(Error::invalid_schema(format!(
                    "Expected projectSchema.resourceSchemas to be an object for {what}"
                )))
            }
        };

        let mut resources = BTreeMap::new();
        for (key, value) in resource_schemas {
            let parsed = input::parse_resource_schema(&project.project_name, key, value)?;
            let name = parsed.resource.resource_name.clone();
            if resources.insert(name.clone(), parsed).is_some() {
                return Err(Error::invalid_schema(format!(
                    "Resource '{}:{name}' is declared more than once in {what}",
                    project.project_name
                )));
            }
        }

        projects.push(ProjectSchemaContext {
            info: ProjectSchemaInfo {
                project_endpoint_name: project.project_endpoint_name.clone(),
                project_name: project.project_name.clone(),
                project_version: project.project_version.clone(),
                is_extension_project: project.is_extension_project,
                physical_schema: normalize_schema_name(&project.project_endpoint_name),
            },
            resources,
            abstract_resources: input::parse_abstract_resources(&project.project_name, schema)?,
        });
    }

    projects.sort_by(|a, b| a.info.project_endpoint_name.cmp(&b.info.project_endpoint_name));
    validate_project_names(&projects)?;

    let mut set = NormalizedSchemaSet {
        projects,
        resource_keys: BTreeMap::new(),
    };

    set.resource_keys = build_resource_key_index(effective, &set)?;
    validate_document_path_targets(&set)?;
    validate_subclass_identities(&set)?;

    log::debug!(
        "normalized {} projects with {} resource keys",
        set.projects.len(),
        set.resource_keys.len()
    );

    Ok(set)
}

fn validate_project_names(projects: &[ProjectSchemaContext]) -> Result<()> {
    for pair in projects.windows(2) {
        if pair[0].info.project_endpoint_name == pair[1].info.project_endpoint_name {
            return Err(Error::invalid_schema(format!(
                "Project endpoint name '{}' is declared more than once",
                pair[0].info.project_endpoint_name
            )));
        }
    }

    let mut schemas = BTreeMap::new();
    for project in projects {
        if let Some(previous) = schemas.insert(
            &project.info.physical_schema,
            &project.info.project_endpoint_name,
        ) {
            return Err(Error::invalid_schema(format!(
                "Physical schema name '{}' is derived from both '{previous}' and '{}'",
                project.info.physical_schema, project.info.project_endpoint_name
            )));
        }
    }

    Ok(())
}

fn build_resource_key_index(
    effective: &EffectiveSchemaSet,
    set: &NormalizedSchemaSet,
) -> Result<BTreeMap<QualifiedResourceName, ResourceKeyEntry>> {
    let mut expected: BTreeMap<QualifiedResourceName, (String, bool)> = BTreeMap::new();
    for project in &set.projects {
        for name in project.resources.keys() {
            expected.insert(
                QualifiedResourceName::new(&project.info.project_name, name),
                (project.info.project_version.clone(), false),
            );
        }
        for resource in &project.abstract_resources {
            expected.insert(
                resource.resource.clone(),
                (project.info.project_version.clone(), true),
            );
        }
    }

    let declared = &effective.effective_schema.resource_keys;

    if declared.is_empty() {
        return expected
            .into_iter()
            .enumerate()
            .map(|(i, (name, (version, is_abstract)))| {
                let id = i16::try_from(i + 1).map_err(|_| {
                    Error::invalid_schema("Effective schema declares more than 32767 resources")
                })?;
                let entry = ResourceKeyEntry {
                    resource_key_id: id,
                    project_name: name.project_name.clone(),
                    resource_name: name.resource_name.clone(),
                    resource_version: version,
                    is_abstract_resource: is_abstract,
                };
                Ok((name, entry))
            })
            .collect();
    }

    let mut index = BTreeMap::new();
    let mut ids = BTreeSet::new();

    for entry in declared {
        let name = entry.resource();

        if !expected.contains_key(&name) {
            return Err(Error::invalid_schema(format!(
                "Resource key {} references unknown resource '{name}'",
                entry.resource_key_id
            )));
        }

        if !ids.insert(entry.resource_key_id) {
            return Err(Error::invalid_schema(format!(
                "Resource key id {} is assigned more than once",
                entry.resource_key_id
            )));
        }

        if index.insert(name.clone(), entry.clone()).is_some() {
            return Err(Error::invalid_schema(format!(
                "Resource '{name}' has more than one resource key"
            )));
        }
    }

    if let Some(missing) = expected.keys().find(|name| !index.contains_key(*name)) {
        return Err(Error::invalid_schema(format!(
            "Effective schema resource key missing for resource '{missing}'"
        )));
    }

    Ok(index)
}

fn validate_document_path_targets(set: &NormalizedSchemaSet) -> Result<()> {
    for (_, schema) in set.resources() {
        for mapping in &schema.references {
            let Some(target_identity) = set.identity_json_paths(&mapping.target) else {
                return Err(Error::invalid_schema(format!(
                    "documentPathsMapping entry '{}' on resource '{}' targets unknown resource '{}'",
                    mapping.mapping_key, schema.resource, mapping.target
                )));
            };

            for binding in &mapping.reference_json_paths {
                if !target_identity.contains(&binding.identity_json_path) {
                    return Err(Error::invalid_schema(format!(
                        "documentPathsMapping entry '{}' on resource '{}' maps identityJsonPath \
                         '{}' which is not an identity path of '{}'",
                        mapping.mapping_key,
                        schema.resource,
                        binding.identity_json_path,
                        mapping.target
                    )));
                }
            }
        }
    }

    Ok(())
}

fn validate_subclass_identities(set: &NormalizedSchemaSet) -> Result<()> {
    for (_, schema) in set.resources() {
        let Some(superclass) = &schema.superclass else {
            continue;
        };

        let Some(super_identity) = set.identity_json_paths(superclass) else {
            return Err(Error::invalid_schema(format!(
                "Subclass resource '{}' names unknown superclass '{superclass}'",
                schema.resource
            )));
        };

        match &schema.superclass_identity_json_path {
            Some(mapped) => {
                if schema.identity_json_paths.len() != 1 {
                    return Err(Error::invalid_schema(format!(
                        "Subclass resource '{}' declares superclassIdentityJsonPath but has {} \
                         identity paths; exactly one is required",
                        schema.resource,
                        schema.identity_json_paths.len()
                    )));
                }

                if !super_identity.contains(mapped) {
                    return Err(Error::invalid_schema(format!(
                        "superclassIdentityJsonPath '{mapped}' on resource '{}' is not an identity \
                         path of superclass '{superclass}'",
                        schema.resource
                    )));
                }
            }
            None => {
                if let Some(missing) = super_identity
                    .iter()
                    .find(|path| !schema.identity_json_paths.contains(path))
                {
                    return Err(Error::invalid_schema(format!(
                        "Subclass resource '{}' is missing superclass identity path '{missing}' \
                         of '{superclass}'",
                        schema.resource
                    )));
                }
            }
        }
    }

    Ok(())
}
