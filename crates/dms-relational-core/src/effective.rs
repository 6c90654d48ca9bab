//! The effective schema set consumed by a build.
//!
//! These types are read-only inputs. Project schemas are kept as raw JSON and
//! interpreted by the normalizer, which reports inconsistencies as
//! invalid-schema errors instead of deserialization failures.

use crate::{schema::QualifiedResourceName, Result};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSchemaSet {
    pub effective_schema: EffectiveSchemaInfo,
    pub projects: Vec<EffectiveProjectSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSchemaInfo {
    #[serde(default)]
    pub api_schema_format_version: String,

    #[serde(default)]
    pub effective_schema_hash: String,

    /// When empty, keys are assigned during normalization
    #[serde(default)]
    pub resource_keys: Vec<ResourceKeyEntry>,
}

/// Resolved identity-key definition for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKeyEntry {
    pub resource_key_id: i16,
    pub project_name: String,
    pub resource_name: String,
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub is_abstract_resource: bool,
}

impl ResourceKeyEntry {
    pub fn resource(&self) -> QualifiedResourceName {
        QualifiedResourceName::new(&self.project_name, &self.resource_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveProjectSchema {
    pub project_endpoint_name: String,
    pub project_name: String,
    #[serde(default)]
    pub project_version: String,
    #[serde(default)]
    pub is_extension_project: bool,
    pub project_schema: serde_json::Value,
}

impl EffectiveSchemaSet {
    /// Wraps `projects` with an empty schema header.
    pub fn from_projects(projects: Vec<EffectiveProjectSchema>) -> Self {
        EffectiveSchemaSet {
            effective_schema: EffectiveSchemaInfo::default(),
            projects,
        }
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src)?)
    }
}

impl EffectiveProjectSchema {
    /// Builds a project entry from an ApiSchema-style `projectSchema` object,
    /// reading the project header fields from it.
    pub fn from_project_schema(project_schema: serde_json::Value) -> Result<Self> {
        let field = |name: &str| {
            project_schema
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    crate::Error::invalid_schema(format!("projectSchema.{name} is required"))
                })
        };

        Ok(EffectiveProjectSchema {
            project_endpoint_name: field("projectEndpointName")?,
            project_name: field("projectName")?,
            project_version: field("projectVersion").unwrap_or_default(),
            is_extension_project: project_schema
                .get("isExtensionProject")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            project_schema,
        })
    }
}
