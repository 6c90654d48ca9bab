//! Walks of `jsonSchemaForInsert` shared by the per-resource steps and the
//! extension pass.

use crate::{
    schema::{
        constraint_naming,
        db::{
            owning_table_index, ColumnKind, DbColumnModel, DbKeyColumn, DbTableModel, DbTableName,
            DescriptorEdgeSource, ReferentialAction, RelationalScalarType, TableConstraint,
        },
        input::DecimalInfo,
        name::{collection_base_name, column_base_name, descriptor_id_column_name, ordinal_column_name},
        scalar_type, DescriptorPathMap, JsonPath, JsonPathSegment, NameOverrideKind,
        NameOverrides, QualifiedResourceName,
    },
    Error, Result,
};

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The `type` of a schema node; nodes with `properties` count as objects.
pub(crate) fn schema_type(node: &Value) -> Option<&str> {
    match node.get("type") {
        Some(Value::String(ty)) => Some(ty.as_str()),
        _ if node.get("properties").is_some() => Some("object"),
        _ => None,
    }
}

pub(crate) fn properties(node: &Value) -> Option<&Map<String, Value>> {
    node.get("properties").and_then(Value::as_object)
}

pub(crate) fn is_required(node: &Value, property: &str) -> bool {
    node.get("required")
        .and_then(Value::as_array)
        .is_some_and(|required| required.iter().any(|name| name.as_str() == Some(property)))
}

/// The schema node describing `path`.
pub(crate) fn schema_node_at<'a>(root: &'a Value, path: &JsonPath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = match segment {
            JsonPathSegment::Property(name) => properties(node)?.get(name)?,
            JsonPathSegment::AnyArrayElement => node.get("items")?,
        };
    }
    Some(node)
}

pub(crate) fn validate(node: &Value, path: &JsonPath, resource: &QualifiedResourceName) -> Result<()> {
    match schema_type(node) {
        Some("object") => {
            let Some(properties) = properties(node) else {
                return Ok(());
            };

            for (name, child) in properties {
                let child_path = path.property(name);
                if !child.is_object() {
                    return Err(Error::invalid_schema(format!(
                        "Property schema at {child_path} on resource '{resource}' must be an object"
                    )));
                }
                validate(child, &child_path, resource)?;
            }
            Ok(())
        }
        Some("array") => match node.get("items") {
            Some(items) if schema_type(items) == Some("object") => {
                validate(items, &path.any_element(), resource)
            }
            _ => Err(Error::invalid_schema(format!(
                "Array schema at {path} on resource '{resource}' must declare object items"
            ))),
        },
        _ => Ok(()),
    }
}

/// Key columns of a child table under `parent`.
///
/// The root `DocumentId` becomes `{root_base}_DocumentId` and the parent's
/// own `Ordinal` becomes `{parent_base}Ordinal`; a new `Ordinal` ends the key.
pub(crate) fn child_key_columns(
    parent: &[DbKeyColumn],
    root_base: &str,
    parent_base: Option<&str>,
) -> Vec<DbKeyColumn> {
    let mut keys: Vec<DbKeyColumn> = parent
        .iter()
        .map(|key| match (key.name.as_str(), parent_base) {
            ("DocumentId", _) => DbKeyColumn {
                name: format!("{root_base}_DocumentId"),
                kind: ColumnKind::ParentKeyPart,
            },
            ("Ordinal", Some(base)) => DbKeyColumn {
                name: ordinal_column_name(base),
                kind: ColumnKind::Ordinal,
            },
            _ => key.clone(),
        })
        .collect();

    keys.push(DbKeyColumn {
        name: "Ordinal".to_string(),
        kind: ColumnKind::Ordinal,
    });
    keys
}

fn key_column_type(kind: ColumnKind) -> RelationalScalarType {
    match kind {
        ColumnKind::Ordinal => RelationalScalarType::int32(),
        _ => RelationalScalarType::int64(),
    }
}

/// A table keyed by `keys`, with a column per key part.
pub(crate) fn keyed_table(name: DbTableName, scope: JsonPath, keys: Vec<DbKeyColumn>) -> DbTableModel {
    let mut table = DbTableModel::new(name, scope);
    for key in &keys {
        table.push_column(DbColumnModel::new(&key.name, key.kind, key_column_type(key.kind)));
    }
    table.key_columns = keys;
    table
}

/// Cascading FK from `child` to `parent` over the parent's key, matched
/// positionally against the leading child key columns.
pub(crate) fn parent_foreign_key(child: &DbTableModel, parent: &DbTableModel) -> TableConstraint {
    let target_columns = parent.key_column_names();
    let columns = child
        .key_columns
        .iter()
        .take(target_columns.len())
        .map(|key| key.name.clone())
        .collect();

    TableConstraint::ForeignKey {
        name: constraint_naming::parent_fk(&child.table, &parent.table),
        columns,
        target_table: parent.table.clone(),
        target_columns,
        on_delete: ReferentialAction::Cascade,
        on_update: ReferentialAction::NoAction,
    }
}

/// Creates one child table per array below a table scope.
pub(crate) struct ScopeDerivation<'a> {
    pub root_base: &'a str,
    /// Reference object paths; their subtrees never hold tables
    pub skip: &'a [JsonPath],
    pub overrides: &'a mut NameOverrides,
    pub tables: &'a mut Vec<DbTableModel>,
    pub collection_bases: &'a mut BTreeMap<JsonPath, String>,
}

impl ScopeDerivation<'_> {
    /// Walks the object `node` at `path`, owned by `tables[parent]`.
    pub(crate) fn walk(&mut self, node: &Value, path: &JsonPath, parent: usize) -> Result<()> {
        let Some(properties) = properties(node) else {
            return Ok(());
        };

        for (name, child) in properties {
            if name == "_ext" {
                continue;
            }

            let child_path = path.property(name);
            if self.skip.contains(&child_path) {
                continue;
            }

            match schema_type(child) {
                Some("object") => self.walk(child, &child_path, parent)?,
                Some("array") => {
                    let scope = child_path.any_element();
                    let base = self
                        .overrides
                        .take(&scope, NameOverrideKind::Collection)
                        .unwrap_or_else(|| collection_base_name(name));

                    let index = self.push_child_table(parent, scope.clone(), &base);

                    if let Some(items) = child.get("items") {
                        self.walk(items, &scope, index)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn push_child_table(&mut self, parent: usize, scope: JsonPath, base: &str) -> usize {
        let parent_table = &self.tables[parent];
        let name = DbTableName::new(
            &parent_table.table.schema,
            format!("{}{base}", parent_table.table.name),
        );
        let keys = child_key_columns(
            &parent_table.key_columns,
            self.root_base,
            self.collection_bases
                .get(&parent_table.scope)
                .map(String::as_str),
        );

        let mut table = keyed_table(name, scope.clone(), keys);
        let fk = parent_foreign_key(&table, parent_table);
        table.push_constraint(fk);

        self.collection_bases.insert(scope, base.to_string());
        self.tables.push(table);
        self.tables.len() - 1
    }
}

/// Adds scalar and descriptor columns for every leaf below a path.
pub(crate) struct ColumnDerivation<'a> {
    pub resource: &'a QualifiedResourceName,
    pub descriptor_paths: &'a DescriptorPathMap,
    pub decimal_infos: &'a BTreeMap<JsonPath, DecimalInfo>,
    pub identity_paths: &'a [JsonPath],
    pub skip: &'a [JsonPath],
    pub overrides: &'a mut NameOverrides,
    pub tables: &'a mut Vec<DbTableModel>,
    pub edges: &'a mut Vec<DescriptorEdgeSource>,
}

impl ColumnDerivation<'_> {
    /// Walks the object `node` at `path`. `optional` is true when some
    /// ancestor object may be absent.
    pub(crate) fn walk(&mut self, node: &Value, path: &JsonPath, optional: bool) -> Result<()> {
        let Some(properties) = properties(node) else {
            return Ok(());
        };

        for (name, child) in properties {
            if name == "_ext" {
                continue;
            }

            let child_path = path.property(name);
            if self.skip.contains(&child_path) {
                continue;
            }

            let child_optional = optional || !is_required(node, name);

            match schema_type(child) {
                Some("object") => self.walk(child, &child_path, child_optional)?,
                Some("array") => {
                    if let Some(items) = child.get("items") {
                        self.walk(items, &child_path.any_element(), false)?;
                    }
                }
                _ => {
                    let nullable = child_optional
                        || child.get("x-nullable").and_then(Value::as_bool) == Some(true);
                    let schema = child.as_object().ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "Property schema at {child_path} on resource '{}' must be an object",
                            self.resource
                        ))
                    })?;
                    self.add_leaf(schema, &child_path, nullable)?;
                }
            }
        }

        Ok(())
    }

    fn add_leaf(&mut self, schema: &Map<String, Value>, path: &JsonPath, nullable: bool) -> Result<()> {
        let Some(index) = owning_table_index(self.tables.as_slice(), path) else {
            return Err(Error::invalid_schema(format!(
                "No table owns path '{path}' on resource '{}'",
                self.resource
            )));
        };

        let base = self
            .overrides
            .take(path, NameOverrideKind::Column)
            .unwrap_or_else(|| column_base_name(&self.tables[index].scope, path));

        let column = match self.descriptor_paths.get(path) {
            Some(info) => {
                let name = descriptor_id_column_name(&base);
                self.edges.push(DescriptorEdgeSource {
                    is_identity_component: self.identity_paths.contains(path),
                    descriptor_value_path: path.clone(),
                    table: self.tables[index].table.clone(),
                    fk_column: name.clone(),
                    descriptor_resource: info.descriptor_resource.clone(),
                });
                DbColumnModel::new(name, ColumnKind::DescriptorFk, RelationalScalarType::int64())
                    .target_resource(info.descriptor_resource.clone())
            }
            None => DbColumnModel::new(
                base,
                ColumnKind::Scalar,
                scalar_type::resolve(schema, path, self.decimal_infos)?,
            ),
        }
        .nullable(nullable)
        .source_path(path.clone());

        push_unique_column(&mut self.tables[index], column)?;

        if nullable && self.identity_paths.contains(path) {
            return Err(Error::invalid_schema(format!(
                "Identity path '{path}' on resource '{}' maps to nullable column '{}'",
                self.resource,
                self.tables[index]
                    .column_by_source_path(path)
                    .map(|column| column.name.as_str())
                    .unwrap_or_default()
            )));
        }

        Ok(())
    }
}

/// Adds `column`, failing when another path already derived the same name.
pub(crate) fn push_unique_column(table: &mut DbTableModel, column: DbColumnModel) -> Result<()> {
    if let Some(existing) = table.column(&column.name) {
        let describe = |path: &Option<JsonPath>| {
            path.as_ref()
                .map(|path| path.canonical().to_string())
                .unwrap_or_else(|| "(key)".to_string())
        };
        return Err(Error::invalid_schema(format!(
            "Column name '{}' on table '{}' is derived from both '{}' and '{}'. Use \
             relational.nameOverrides to resolve the collision.",
            column.name,
            table.table,
            describe(&existing.source_path),
            describe(&column.source_path)
        )));
    }

    table.push_column(column);
    Ok(())
}
