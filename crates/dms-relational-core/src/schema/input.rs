//! Typed views over the raw ApiSchema JSON of one project.

use super::{JsonPath, QualifiedResourceName};
use crate::{Error, Result};

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A concrete (or descriptor, or extension) resource schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub resource: QualifiedResourceName,
    pub is_descriptor: bool,
    pub is_resource_extension: bool,
    pub is_subclass: bool,
    pub superclass: Option<QualifiedResourceName>,
    pub superclass_identity_json_path: Option<JsonPath>,
    pub allow_identity_updates: bool,
    pub identity_json_paths: Vec<JsonPath>,
    /// Reference mappings in ordinal mapping-key order
    pub references: Vec<DocumentReferenceMapping>,
    /// Descriptor mappings in ordinal mapping-key order
    pub descriptors: Vec<DescriptorMapping>,
    /// The resource schema object as declared
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorMapping {
    pub mapping_key: String,
    pub path: JsonPath,
    pub descriptor_resource: QualifiedResourceName,
}

/// One identity part of a reference: the target's identity path and where
/// the referencing document carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceJsonPathBinding {
    pub identity_json_path: JsonPath,
    pub reference_json_path: JsonPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReferenceMapping {
    pub mapping_key: String,
    pub target: QualifiedResourceName,
    pub is_required: bool,
    pub is_identity_component: bool,
    /// Common parent of every reference path
    pub reference_object_path: JsonPath,
    pub reference_json_paths: Vec<ReferenceJsonPathBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractResourceSchema {
    pub resource: QualifiedResourceName,
    pub identity_json_paths: Vec<JsonPath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalInfo {
    pub total_digits: Option<u32>,
    pub decimal_places: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityConstraintInput {
    pub source_json_path: JsonPath,
    pub target_json_path: JsonPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayUniquenessConstraintInput {
    pub base_path: Option<JsonPath>,
    pub paths: Vec<JsonPath>,
    pub nested: Vec<ArrayUniquenessConstraintInput>,
}

pub(crate) fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_schema(format!("Expected {what} to be an object")))
}

fn optional_bool(object: &Map<String, Value>, field: &str, what: &str) -> Result<bool> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(Error::invalid_schema(format!(
            "Expected {what}.{field} to be a boolean"
        ))),
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, field: &str, what: &str) -> Result<&'a str> {
    match object.get(field) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.as_str()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(Error::invalid_schema(format!(
            "{what} is missing {field}"
        ))),
        Some(_) => Err(Error::invalid_schema(format!(
            "Expected {what}.{field} to be a string"
        ))),
    }
}

fn optional_str<'a>(object: &'a Map<String, Value>, field: &str, what: &str) -> Result<Option<&'a str>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(Error::invalid_schema(format!(
            "Expected {what}.{field} to be a string"
        ))),
    }
}

/// Reads an optional array field; `null` and absence both mean empty.
fn optional_array<'a>(object: &'a Map<String, Value>, field: &str, what: &str) -> Result<&'a [Value]> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(Error::invalid_schema(format!(
            "Expected {what}.{field} to be an array"
        ))),
    }
}

fn path_list(items: &[Value], what: &str) -> Result<Vec<JsonPath>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(path) => JsonPath::compile(path),
            Value::Null => Err(Error::invalid_schema(format!(
                "Expected {what} to not contain null entries"
            ))),
            _ => Err(Error::invalid_schema(format!(
                "Expected {what} entries to be strings"
            ))),
        })
        .collect()
}

/// Parses one entry of `resourceSchemas`.
pub(crate) fn parse_resource_schema(
    project_name: &str,
    key: &str,
    value: &Value,
) -> Result<ResourceSchema> {
    let what = format!("resourceSchemas.{key}");
    let object = match value {
        Value::Null => {
            return Err(Error::invalid_schema(format!(
                "Expected {what} to be non-null"
            )))
        }
        value => as_object(value, &what)?,
    };

    let resource_name = required_str(object, "resourceName", &what)?;
    let resource = QualifiedResourceName::new(project_name, resource_name);
    let what = format!("resource '{resource}'");

    let is_subclass = optional_bool(object, "isSubclass", &what)?;
    let superclass = match (
        optional_str(object, "superclassProjectName", &what)?,
        optional_str(object, "superclassResourceName", &what)?,
    ) {
        (Some(project), Some(resource)) if is_subclass => {
            Some(QualifiedResourceName::new(project, resource))
        }
        (_, _) if is_subclass => {
            return Err(Error::invalid_schema(format!(
                "Subclass {what} must declare superclassProjectName and superclassResourceName"
            )))
        }
        _ => None,
    };

    let superclass_identity_json_path = optional_str(object, "superclassIdentityJsonPath", &what)?
        .map(JsonPath::compile)
        .transpose()?;

    let identity_json_paths = path_list(
        optional_array(object, "identityJsonPaths", &what)?,
        "identityJsonPaths",
    )?;

    let mut seen = BTreeSet::new();
    for path in &identity_json_paths {
        if !seen.insert(path) {
            return Err(Error::invalid_schema(format!(
                "identityJsonPaths on {what} contains duplicate path '{path}'"
            )));
        }
    }

    let (references, descriptors) =
        parse_document_paths_mapping(object, &resource, &identity_json_paths)?;

    Ok(ResourceSchema {
        resource,
        is_descriptor: optional_bool(object, "isDescriptor", &what)?,
        is_resource_extension: optional_bool(object, "isResourceExtension", &what)?,
        is_subclass,
        superclass,
        superclass_identity_json_path,
        allow_identity_updates: optional_bool(object, "allowIdentityUpdates", &what)?,
        identity_json_paths,
        references,
        descriptors,
        raw: value.clone(),
    })
}

fn parse_document_paths_mapping(
    object: &Map<String, Value>,
    resource: &QualifiedResourceName,
    identity_json_paths: &[JsonPath],
) -> Result<(Vec<DocumentReferenceMapping>, Vec<DescriptorMapping>)> {
    let mappings = match object.get("documentPathsMapping") {
        None | Some(Value::Null) => return Ok((vec![], vec![])),
        Some(value) => as_object(value, "documentPathsMapping")?,
    };

    let identity: BTreeSet<&JsonPath> = identity_json_paths.iter().collect();
    let mut mapped_identity = BTreeSet::new();
    let mut references = vec![];
    let mut descriptors = vec![];

    // serde_json maps iterate in ordinal key order
    for (mapping_key, entry) in mappings {
        let what = format!("documentPathsMapping entry '{mapping_key}' on resource '{resource}'");
        let entry = match entry {
            Value::Null => {
                return Err(Error::invalid_schema(
                    "Expected documentPathsMapping entries to be non-null",
                ))
            }
            entry => as_object(entry, "documentPathsMapping entries")?,
        };

        let Some(is_reference) = entry.get("isReference").and_then(Value::as_bool) else {
            return Err(Error::invalid_schema(format!(
                "Expected isReference to be on {what}"
            )));
        };

        if !is_reference {
            let path = JsonPath::compile(required_str(entry, "path", &what)?)?;
            mapped_identity.insert(path);
            continue;
        }

        let Some(is_descriptor) = entry.get("isDescriptor").and_then(Value::as_bool) else {
            return Err(Error::invalid_schema(format!(
                "Expected isDescriptor to be on {what}"
            )));
        };

        let target = QualifiedResourceName::new(
            required_str(entry, "projectName", &what)?,
            required_str(entry, "resourceName", &what)?,
        );

        if is_descriptor {
            let path = JsonPath::compile(required_str(entry, "path", &what)?)?;
            mapped_identity.insert(path.clone());
            descriptors.push(DescriptorMapping {
                mapping_key: mapping_key.clone(),
                path,
                descriptor_resource: target,
            });
            continue;
        }

        let mapping = parse_reference_mapping(mapping_key, entry, target, &identity, &what)?;
        mapped_identity.extend(
            mapping
                .reference_json_paths
                .iter()
                .map(|binding| binding.reference_json_path.clone()),
        );
        references.push(mapping);
    }

    let missing: Vec<&str> = identity_json_paths
        .iter()
        .filter(|path| !mapped_identity.contains(*path))
        .map(JsonPath::canonical)
        .collect();

    if !missing.is_empty() {
        return Err(Error::invalid_schema(format!(
            "identityJsonPaths on resource '{resource}' were not found in documentPathsMapping: {}.",
            missing.join(", ")
        )));
    }

    Ok((references, descriptors))
}

fn parse_reference_mapping(
    mapping_key: &str,
    entry: &Map<String, Value>,
    target: QualifiedResourceName,
    identity: &BTreeSet<&JsonPath>,
    what: &str,
) -> Result<DocumentReferenceMapping> {
    let items = match entry.get("referenceJsonPaths") {
        None => return Err(Error::invalid_schema(format!("{what} is missing referenceJsonPaths."))),
        Some(Value::Null) => {
            return Err(Error::invalid_schema(format!("{what} has null referenceJsonPaths.")))
        }
        Some(Value::Array(items)) if items.is_empty() => {
            return Err(Error::invalid_schema(format!(
                "{what} has no referenceJsonPaths entries."
            )))
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Error::invalid_schema(
                "Expected referenceJsonPaths to be an array on documentPathsMapping entry",
            ))
        }
    };

    let mut bindings: Vec<ReferenceJsonPathBinding> = vec![];
    let mut prefix: Option<JsonPath> = None;

    for item in items {
        let item = as_object(item, "referenceJsonPaths entries")?;
        let identity_json_path =
            JsonPath::compile(required_str(item, "identityJsonPath", "referenceJsonPaths entry")?)?;
        let reference_json_path =
            JsonPath::compile(required_str(item, "referenceJsonPath", "referenceJsonPaths entry")?)?;

        let Some(item_prefix) = reference_json_path
            .last_property()
            .and_then(|_| reference_json_path.parent())
            .filter(|parent| !parent.is_root())
        else {
            return Err(Error::invalid_schema(format!(
                "{what} has referenceJsonPath '{reference_json_path}' outside a reference object."
            )));
        };

        match &prefix {
            None => prefix = Some(item_prefix),
            Some(existing) if *existing != item_prefix => {
                return Err(Error::invalid_schema(format!(
                    "{what} has inconsistent referenceJsonPaths prefix '{existing}' and '{item_prefix}'."
                )))
            }
            Some(_) => {}
        }

        if let Some(existing) = bindings
            .iter()
            .find(|binding| binding.identity_json_path == identity_json_path)
        {
            return Err(Error::invalid_schema(format!(
                "{what} has duplicate identityJsonPath '{identity_json_path}' mapped to '{}' and '{reference_json_path}'.",
                existing.reference_json_path
            )));
        }

        bindings.push(ReferenceJsonPathBinding {
            identity_json_path,
            reference_json_path,
        });
    }

    let Some(reference_object_path) = prefix else {
        return Err(Error::invalid_schema(format!(
            "{what} has no referenceJsonPaths entries."
        )));
    };

    let in_identity = bindings
        .iter()
        .filter(|binding| identity.contains(&binding.reference_json_path))
        .count();
    let is_identity_component = in_identity > 0;

    if is_identity_component && in_identity != bindings.len() {
        return Err(Error::invalid_schema(format!(
            "{what} is only partially mapped to identityJsonPaths. Identity references must \
             contribute every referenceJsonPath."
        )));
    }

    let is_required = entry
        .get("isRequired")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_identity_component && !is_required {
        return Err(Error::invalid_schema(format!(
            "{what} is mapped to identityJsonPaths but isRequired is false. Identity references must be required."
        )));
    }

    Ok(DocumentReferenceMapping {
        mapping_key: mapping_key.to_string(),
        target,
        is_required,
        is_identity_component,
        reference_object_path,
        reference_json_paths: bindings,
    })
}

/// Parses `abstractResources`; absent or `null` means none.
pub(crate) fn parse_abstract_resources(
    project_name: &str,
    project_schema: &Map<String, Value>,
) -> Result<Vec<AbstractResourceSchema>> {
    let entries = match project_schema.get("abstractResources") {
        None | Some(Value::Null) => return Ok(vec![]),
        Some(value) => as_object(value, "projectSchema.abstractResources")?,
    };

    let mut out = vec![];
    for (key, entry) in entries {
        let what = format!("abstractResources.{key}");
        let entry = as_object(entry, &what)?;
        let name = optional_str(entry, "resourceName", &what)?.unwrap_or(key.as_str());
        out.push(AbstractResourceSchema {
            resource: QualifiedResourceName::new(project_name, name),
            identity_json_paths: path_list(
                optional_array(entry, "identityJsonPaths", &what)?,
                "abstractResources identityJsonPaths",
            )?,
        });
    }

    Ok(out)
}

/// Parses `decimalPropertyValidationInfos` keyed by path.
pub(crate) fn parse_decimal_infos(schema: &ResourceSchema) -> Result<BTreeMap<JsonPath, DecimalInfo>> {
    let object = as_object(&schema.raw, "resource schema")?;
    let what = format!("resource '{}'", schema.resource);
    let mut out = BTreeMap::new();

    for item in optional_array(object, "decimalPropertyValidationInfos", &what)? {
        let item = as_object(item, "decimalPropertyValidationInfos entries")?;
        let path = JsonPath::compile(required_str(item, "path", "decimalPropertyValidationInfos entry")?)?;
        let digits = |field: &str| item.get(field).and_then(Value::as_u64).map(|v| v as u32);

        out.insert(
            path,
            DecimalInfo {
                total_digits: digits("totalDigits"),
                decimal_places: digits("decimalPlaces"),
            },
        );
    }

    Ok(out)
}

pub(crate) fn parse_equality_constraints(schema: &ResourceSchema) -> Result<Vec<EqualityConstraintInput>> {
    let object = as_object(&schema.raw, "resource schema")?;
    let what = format!("resource '{}'", schema.resource);

    optional_array(object, "equalityConstraints", &what)?
        .iter()
        .map(|item| {
            let item = as_object(item, "equalityConstraints entries")?;
            Ok(EqualityConstraintInput {
                source_json_path: JsonPath::compile(required_str(item, "sourceJsonPath", "equalityConstraints entry")?)?,
                target_json_path: JsonPath::compile(required_str(item, "targetJsonPath", "equalityConstraints entry")?)?,
            })
        })
        .collect()
}

pub(crate) fn parse_array_uniqueness_constraints(
    schema: &ResourceSchema,
) -> Result<Vec<ArrayUniquenessConstraintInput>> {
    let object = as_object(&schema.raw, "resource schema")?;
    let what = format!("resource '{}'", schema.resource);
    parse_array_uniqueness_list(
        optional_array(object, "arrayUniquenessConstraints", &what)?,
        &schema.resource,
        false,
    )
}

fn parse_array_uniqueness_list(
    items: &[Value],
    resource: &QualifiedResourceName,
    nested: bool,
) -> Result<Vec<ArrayUniquenessConstraintInput>> {
    let mut out = vec![];

    for item in items {
        let item = match item {
            Value::Null => {
                return Err(Error::invalid_schema(
                    "Expected arrayUniquenessConstraints to not contain null entries",
                ))
            }
            item => as_object(item, "arrayUniquenessConstraints entries")?,
        };

        let base_path = optional_str(item, "basePath", "arrayUniquenessConstraints")?
            .map(JsonPath::compile)
            .transpose()?;

        if nested && base_path.is_none() {
            return Err(Error::invalid_schema(format!(
                "arrayUniquenessConstraints nestedConstraints entry is missing basePath on resource '{resource}'."
            )));
        }

        let paths = match item.get("paths") {
            Some(Value::Array(paths)) if paths.is_empty() => {
                return Err(Error::invalid_schema(
                    "Expected arrayUniquenessConstraints.paths to contain entries",
                ))
            }
            Some(Value::Array(paths)) => path_list(paths, "arrayUniquenessConstraints.paths")?,
            _ => {
                return Err(Error::invalid_schema(
                    "Expected arrayUniquenessConstraints.paths to be an array",
                ))
            }
        };

        out.push(ArrayUniquenessConstraintInput {
            base_path,
            paths,
            nested: parse_array_uniqueness_list(
                optional_array(item, "nestedConstraints", "arrayUniquenessConstraints")?,
                resource,
                true,
            )?,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn school_reference_mapping() -> Value {
        json!({
            "isReference": true,
            "isDescriptor": false,
            "isRequired": true,
            "projectName": "Ed-Fi",
            "resourceName": "School",
            "referenceJsonPaths": [
                { "identityJsonPath": "$.schoolId", "referenceJsonPath": "$.schoolReference.schoolId" }
            ]
        })
    }

    #[test]
    fn reference_object_path_is_common_parent() {
        let schema = json!({
            "resourceName": "Session",
            "identityJsonPaths": ["$.schoolReference.schoolId", "$.sessionName"],
            "documentPathsMapping": {
                "School": school_reference_mapping(),
                "SessionName": { "isReference": false, "path": "$.sessionName" }
            }
        });

        let parsed = parse_resource_schema("Ed-Fi", "sessions", &schema).unwrap();
        assert_eq!(parsed.references.len(), 1);

        let reference = &parsed.references[0];
        assert_eq!(reference.reference_object_path.canonical(), "$.schoolReference");
        assert!(reference.is_identity_component);
        assert!(reference.is_required);
    }

    #[test]
    fn uncovered_identity_path_is_rejected() {
        let schema = json!({
            "resourceName": "Session",
            "identityJsonPaths": ["$.sessionName"],
            "documentPathsMapping": {}
        });

        let err = parse_resource_schema("Ed-Fi", "sessions", &schema).unwrap_err();
        assert!(err.is_invalid_schema());
        assert!(err.to_string().contains("were not found in documentPathsMapping: $.sessionName."));
    }

    #[test]
    fn optional_identity_reference_is_rejected() {
        let mut mapping = school_reference_mapping();
        mapping["isRequired"] = json!(false);

        let schema = json!({
            "resourceName": "Session",
            "identityJsonPaths": ["$.schoolReference.schoolId"],
            "documentPathsMapping": { "School": mapping }
        });

        let err = parse_resource_schema("Ed-Fi", "sessions", &schema).unwrap_err();
        assert!(err.to_string().contains("Identity references must be required"));
    }

    #[test]
    fn nested_array_constraint_requires_base_path() {
        let schema = ResourceSchema {
            resource: QualifiedResourceName::new("Ed-Fi", "Assessment"),
            is_descriptor: false,
            is_resource_extension: false,
            is_subclass: false,
            superclass: None,
            superclass_identity_json_path: None,
            allow_identity_updates: false,
            identity_json_paths: vec![],
            references: vec![],
            descriptors: vec![],
            raw: json!({
                "arrayUniquenessConstraints": [{
                    "paths": ["$.items[*].code"],
                    "nestedConstraints": [{ "paths": ["$.levels[*].code"] }]
                }]
            }),
        };

        let err = parse_array_uniqueness_constraints(&schema).unwrap_err();
        assert!(err.to_string().contains("missing basePath"));
    }
}
