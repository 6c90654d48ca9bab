//! Per-resource step pipeline.

use super::traversal::{self, ColumnDerivation, ScopeDerivation};
use crate::{
    schema::{
        constraint_naming,
        db::{
            ColumnKind, DbColumnModel, DbKeyColumn, DbTableModel, DbTableName,
            DescriptorEdgeSource, ReferentialAction, RelationalScalarType, TableConstraint,
        },
        input::{
            self, ArrayUniquenessConstraintInput, DecimalInfo, DocumentReferenceMapping,
            EqualityConstraintInput, ResourceSchema,
        },
        name::to_pascal_case,
        DescriptorPathMap, JsonPath, QualifiedResourceName,
    },
    Error, Result, UnusedNameOverrideEntry,
};

use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
};

/// What a name override renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOverrideKind {
    /// A column, or the base name of a reference's columns
    Column,

    /// The base name of a collection table. Keyed by the `[*]` path.
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameOverride {
    raw_key: String,
    name: String,
    kind: NameOverrideKind,
}

/// `relational.nameOverrides` of one resource, with use tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameOverrides {
    entries: BTreeMap<JsonPath, NameOverride>,
    used: BTreeSet<JsonPath>,
}

impl NameOverrides {
    /// Returns the override for `path` and marks it used.
    pub fn take(&mut self, path: &JsonPath, kind: NameOverrideKind) -> Option<String> {
        let entry = self.entries.get(path).filter(|entry| entry.kind == kind)?;
        self.used.insert(path.clone());
        Some(entry.name.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Declared overrides no pass applied, ordered by canonical path.
    pub fn unused(&self) -> Vec<UnusedNameOverrideEntry> {
        self.entries
            .iter()
            .filter(|(path, _)| !self.used.contains(*path))
            .map(|(path, entry)| UnusedNameOverrideEntry {
                raw_key: entry.raw_key.clone(),
                canonical_path: path.canonical().to_string(),
            })
            .collect()
    }
}

/// State of one resource while its tables are derived.
///
/// Created at most once per resource by the set context and cached there;
/// later passes read and extend it.
#[derive(Debug, Clone)]
pub struct RelationalModelBuilderContext {
    pub resource: QualifiedResourceName,
    pub physical_schema: String,
    pub(crate) core_schema: String,
    pub(crate) schema: ResourceSchema,

    /// Base and extension descriptor paths, combined
    pub descriptor_paths: DescriptorPathMap,

    pub identity_json_paths: Vec<JsonPath>,
    pub document_references: Vec<DocumentReferenceMapping>,
    pub array_uniqueness_constraints: Vec<ArrayUniquenessConstraintInput>,
    pub decimal_infos: BTreeMap<JsonPath, DecimalInfo>,
    pub equality_constraints: Vec<EqualityConstraintInput>,
    pub root_table_name_override: Option<String>,
    pub name_overrides: NameOverrides,
    pub json_schema_for_insert: Value,

    pub root: Option<DbTableName>,

    /// Parents precede their children
    pub tables: Vec<DbTableModel>,

    pub descriptor_edge_sources: Vec<DescriptorEdgeSource>,

    /// Collection base name of every array scope
    pub(crate) collection_bases: BTreeMap<JsonPath, String>,
}

impl RelationalModelBuilderContext {
    pub(crate) fn new(
        schema: ResourceSchema,
        physical_schema: String,
        core_schema: String,
        descriptor_paths: DescriptorPathMap,
    ) -> Self {
        RelationalModelBuilderContext {
            resource: schema.resource.clone(),
            physical_schema,
            core_schema,
            schema,
            descriptor_paths,
            identity_json_paths: vec![],
            document_references: vec![],
            array_uniqueness_constraints: vec![],
            decimal_infos: BTreeMap::new(),
            equality_constraints: vec![],
            root_table_name_override: None,
            name_overrides: NameOverrides::default(),
            json_schema_for_insert: Value::Null,
            root: None,
            tables: vec![],
            descriptor_edge_sources: vec![],
            collection_bases: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Descriptor and resource extensions carry no tables of their own.
    pub fn derives_tables(&self) -> bool {
        !self.schema.is_descriptor && !self.schema.is_resource_extension
    }

    /// Paths of every reference object, skipped by the scalar traversal.
    pub(crate) fn reference_object_paths(&self) -> Vec<JsonPath> {
        self.document_references
            .iter()
            .map(|mapping| mapping.reference_object_path.clone())
            .collect()
    }

    pub(crate) fn run(&mut self, steps: &[Box<dyn ResourceStep>]) -> Result<()> {
        for step in steps {
            log::trace!("resource {}: step {}", self.resource, step.name());
            step.execute(self)?;
        }
        Ok(())
    }
}

/// One step of the per-resource pipeline.
pub trait ResourceStep: Debug {
    fn name(&self) -> &'static str;

    fn execute(&self, cx: &mut RelationalModelBuilderContext) -> Result<()>;
}

pub(crate) fn default_steps() -> Vec<Box<dyn ResourceStep>> {
    vec![
        Box::new(ExtractInputs),
        Box::new(ValidateJsonSchema),
        Box::new(DeriveTableScopesAndKeys),
        Box::new(DeriveColumnsAndBindDescriptorEdges),
    ]
}

/// Copies the resource's declared inputs into the context.
#[derive(Debug)]
pub struct ExtractInputs;

impl ResourceStep for ExtractInputs {
    fn name(&self) -> &'static str {
        "ExtractInputs"
    }

    fn execute(&self, cx: &mut RelationalModelBuilderContext) -> Result<()> {
        cx.identity_json_paths = cx.schema.identity_json_paths.clone();
        cx.document_references = cx.schema.references.clone();
        cx.array_uniqueness_constraints = input::parse_array_uniqueness_constraints(&cx.schema)?;
        cx.decimal_infos = input::parse_decimal_infos(&cx.schema)?;
        cx.equality_constraints = input::parse_equality_constraints(&cx.schema)?;
        cx.json_schema_for_insert = cx
            .schema
            .raw
            .get("jsonSchemaForInsert")
            .cloned()
            .unwrap_or(Value::Null);

        let relational = match cx.schema.raw.get("relational") {
            None | Some(Value::Null) => return Ok(()),
            Some(_) if cx.schema.is_descriptor => {
                return Err(Error::invalid_schema(format!(
                    "Descriptor resource '{}' must not declare relational overrides",
                    cx.resource
                )))
            }
            Some(value) => input::as_object(value, "relational")?,
        };

        cx.root_table_name_override = match relational.get("rootTableNameOverride") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
            Some(_) => {
                return Err(Error::invalid_schema(format!(
                    "relational.rootTableNameOverride on resource '{}' must be a non-empty string",
                    cx.resource
                )))
            }
        };

        let declared = match relational.get("nameOverrides") {
            None | Some(Value::Null) => return Ok(()),
            Some(value) => input::as_object(value, "relational.nameOverrides")?,
        };

        let references = cx.document_references.clone();
        for (raw_key, value) in declared {
            let path = JsonPath::compile(raw_key).map_err(|e| {
                e.context(Error::invalid_schema(format!(
                    "relational.nameOverrides key '{raw_key}' on resource '{}' is not a valid JSONPath",
                    cx.resource
                )))
            })?;

            let name = match value {
                Value::String(name) if !name.is_empty() => name.clone(),
                _ => {
                    return Err(Error::invalid_schema(format!(
                        "relational.nameOverrides value for '{raw_key}' on resource '{}' must be a non-empty string",
                        cx.resource
                    )))
                }
            };

            for mapping in &references {
                let inside = path.starts_with(&mapping.reference_object_path)
                    && path != mapping.reference_object_path;
                let is_identity = mapping
                    .reference_json_paths
                    .iter()
                    .any(|binding| binding.reference_json_path == path);

                if inside && !is_identity {
                    return Err(Error::invalid_schema(format!(
                        "relational.nameOverrides entry '{raw_key}' on resource '{}' targets \
                         '{path}' inside reference object '{}'; only reference identity paths \
                         may be overridden",
                        cx.resource, mapping.reference_object_path
                    )));
                }
            }

            let kind = if path.ends_with_array() {
                NameOverrideKind::Collection
            } else {
                NameOverrideKind::Column
            };

            let entry = NameOverride {
                raw_key: raw_key.clone(),
                name,
                kind,
            };

            if cx.name_overrides.entries.insert(path.clone(), entry).is_some() {
                return Err(Error::invalid_schema(format!(
                    "relational.nameOverrides on resource '{}' declares '{path}' more than once",
                    cx.resource
                )));
            }
        }

        Ok(())
    }
}

/// Checks the shape of `jsonSchemaForInsert` the later steps depend on.
#[derive(Debug)]
pub struct ValidateJsonSchema;

impl ResourceStep for ValidateJsonSchema {
    fn name(&self) -> &'static str {
        "ValidateJsonSchema"
    }

    fn execute(&self, cx: &mut RelationalModelBuilderContext) -> Result<()> {
        if cx.schema.is_descriptor {
            return Ok(());
        }

        if !cx.json_schema_for_insert.is_object() {
            return Err(Error::invalid_schema(format!(
                "jsonSchemaForInsert on resource '{}' must be an object schema",
                cx.resource
            )));
        }

        traversal::validate(&cx.json_schema_for_insert, &JsonPath::root(), &cx.resource)
    }
}

/// Creates the root table and one child table per array scope, each with
/// its key columns and parent foreign key.
#[derive(Debug)]
pub struct DeriveTableScopesAndKeys;

impl ResourceStep for DeriveTableScopesAndKeys {
    fn name(&self) -> &'static str {
        "DeriveTableScopesAndKeys"
    }

    fn execute(&self, cx: &mut RelationalModelBuilderContext) -> Result<()> {
        if !cx.derives_tables() {
            return Ok(());
        }

        let root_name = cx
            .root_table_name_override
            .clone()
            .unwrap_or_else(|| to_pascal_case(&cx.resource.resource_name));
        let root = DbTableName::new(&cx.physical_schema, root_name.clone());

        let mut table = DbTableModel::new(root.clone(), JsonPath::root());
        table.key_columns.push(DbKeyColumn {
            name: "DocumentId".to_string(),
            kind: ColumnKind::ParentKeyPart,
        });
        table.push_column(DbColumnModel::new(
            "DocumentId",
            ColumnKind::ParentKeyPart,
            RelationalScalarType::int64(),
        ));
        table.push_constraint(TableConstraint::ForeignKey {
            name: constraint_naming::document_fk(&root),
            columns: vec!["DocumentId".to_string()],
            target_table: DbTableName::new(&cx.core_schema, "Document"),
            target_columns: vec!["DocumentId".to_string()],
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::NoAction,
        });

        cx.root = Some(root);
        cx.tables = vec![table];

        let skip = cx.reference_object_paths();
        let node = cx.json_schema_for_insert.clone();

        ScopeDerivation {
            root_base: &root_name,
            skip: &skip,
            overrides: &mut cx.name_overrides,
            tables: &mut cx.tables,
            collection_bases: &mut cx.collection_bases,
        }
        .walk(&node, &JsonPath::root(), 0)?;

        log::trace!(
            "resource {}: derived {} table scopes",
            cx.resource,
            cx.tables.len()
        );

        Ok(())
    }
}

/// Adds scalar and descriptor columns and records descriptor edge sources.
#[derive(Debug)]
pub struct DeriveColumnsAndBindDescriptorEdges;

impl ResourceStep for DeriveColumnsAndBindDescriptorEdges {
    fn name(&self) -> &'static str {
        "DeriveColumnsAndBindDescriptorEdges"
    }

    fn execute(&self, cx: &mut RelationalModelBuilderContext) -> Result<()> {
        if !cx.derives_tables() {
            return Ok(());
        }

        let skip = cx.reference_object_paths();
        let node = cx.json_schema_for_insert.clone();

        ColumnDerivation {
            resource: &cx.resource,
            descriptor_paths: &cx.descriptor_paths,
            decimal_infos: &cx.decimal_infos,
            identity_paths: &cx.identity_json_paths,
            skip: &skip,
            overrides: &mut cx.name_overrides,
            tables: &mut cx.tables,
            edges: &mut cx.descriptor_edge_sources,
        }
        .walk(&node, &JsonPath::root(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::input::parse_resource_schema;
    use serde_json::json;

    fn builder_for(value: Value) -> RelationalModelBuilderContext {
        let schema = parse_resource_schema("Ed-Fi", "students", &value).unwrap();
        RelationalModelBuilderContext::new(
            schema,
            "edfi".to_string(),
            "dms".to_string(),
            DescriptorPathMap::new(),
        )
    }

    fn student(relational: Value) -> Value {
        json!({
            "resourceName": "Student",
            "identityJsonPaths": ["$.studentUniqueId"],
            "relational": relational,
            "jsonSchemaForInsert": {
                "type": "object",
                "required": ["studentUniqueId"],
                "properties": {
                    "studentUniqueId": {"type": "string", "maxLength": 32},
                    "addresses": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "city": {"type": "string", "maxLength": 30}
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn overrides_are_keyed_by_kind() {
        let mut cx = builder_for(student(json!({
            "nameOverrides": {
                "$.addresses[*]": "Residence",
                "$.studentUniqueId": "UniqueId"
            }
        })));
        cx.run(&default_steps()).unwrap();

        let names: Vec<&str> = cx.tables.iter().map(|t| t.table.name.as_str()).collect();
        assert_eq!(names, ["Student", "StudentResidence"]);
        assert!(cx.tables[0].has_column("UniqueId"));
        assert!(cx.name_overrides.unused().is_empty());
    }

    #[test]
    fn unused_overrides_are_reported() {
        let mut cx = builder_for(student(json!({
            "nameOverrides": { "$.nickname": "Alias" }
        })));
        cx.run(&default_steps()).unwrap();

        let unused = cx.name_overrides.unused();
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].canonical_path, "$.nickname");
    }

    #[test]
    fn empty_override_value_is_rejected() {
        let mut cx = builder_for(student(json!({
            "nameOverrides": { "$.studentUniqueId": "" }
        })));
        let err = cx.run(&default_steps()).unwrap_err();
        assert!(err.is_invalid_schema());
        assert!(err.to_string().contains("must be a non-empty string"));
    }

    #[test]
    fn root_table_override() {
        let mut cx = builder_for(student(json!({ "rootTableNameOverride": "Learner" })));
        cx.run(&default_steps()).unwrap();

        assert_eq!(cx.root, Some(DbTableName::new("edfi", "Learner")));
        assert_eq!(cx.tables[1].table.name, "LearnerAddress");
        assert_eq!(
            cx.tables[1].key_column_names(),
            ["Learner_DocumentId", "Ordinal"]
        );
    }
}
