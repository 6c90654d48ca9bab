use anyhow::{Context, Result};
use dms_relational_core::{effective::EffectiveProjectSchema, EffectiveSchemaSet};
use serde_json::Value;
use std::path::Path;

/// Reads the build input from `paths`.
///
/// A single file may hold a whole effective schema set (an object with
/// `projects`). Otherwise each file is one ApiSchema document, either
/// wrapping its project under `projectSchema` or being the project schema
/// itself, and the files are combined in the given order.
pub fn load_effective_schema(paths: &[impl AsRef<Path>]) -> Result<EffectiveSchemaSet> {
    let mut documents = vec![];
    for path in paths {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading schema file {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("parsing schema file {}", path.display()))?;
        documents.push((path, value));
    }

    if let [(path, value)] = documents.as_slice() {
        if value.get("projects").is_some() {
            let set = serde_json::from_value(value.clone())
                .with_context(|| format!("reading effective schema set {}", path.display()))?;
            return Ok(set);
        }
    }

    let mut projects = vec![];
    for (path, value) in documents {
        let project_schema = match value.get("projectSchema") {
            Some(project_schema) => project_schema.clone(),
            None => value,
        };
        let project = EffectiveProjectSchema::from_project_schema(project_schema)
            .with_context(|| format!("reading project schema {}", path.display()))?;
        projects.push(project);
    }

    Ok(EffectiveSchemaSet::from_projects(projects))
}
