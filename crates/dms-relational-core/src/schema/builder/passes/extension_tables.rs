use super::descriptor_mapping::ensure_descriptor_target;
use crate::{
    schema::{
        builder::traversal::{
            self, keyed_table, parent_foreign_key, ColumnDerivation, ScopeDerivation,
        },
        db::{owning_table_index, DbTableName, ExtensionSite},
        JsonPath, QualifiedResourceName, RelationalModelSetBuilderContext, RelationalModelSetPass,
    },
    Error, ExtensionSiteContext, Result,
};

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Derives the tables extension projects attach to core resources through
/// `_ext`, and registers each core resource's extension sites.
#[derive(Debug)]
pub struct ExtensionTableDerivation;

/// One `_ext.{key}` object of an extension resource schema.
struct SiteObject {
    extension_path: JsonPath,
    key: String,
    node: Value,
    /// The object may be absent from a document
    optional: bool,
}

impl RelationalModelSetPass for ExtensionTableDerivation {
    fn name(&self) -> &'static str {
        "ExtensionTableDerivation"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let extensions: Vec<QualifiedResourceName> = cx
            .schema
            .projects
            .iter()
            .filter(|project| project.info.is_extension_project)
            .flat_map(|project| project.resources.values())
            .filter(|schema| schema.is_resource_extension)
            .map(|schema| schema.resource.clone())
            .collect();

        let mut sites_by_base: BTreeMap<QualifiedResourceName, BTreeMap<(JsonPath, JsonPath), BTreeSet<String>>> =
            BTreeMap::new();

        for extension in &extensions {
            let base = base_resource_of(cx, extension)?;
            let mut ext_builder = cx.resource_builder(extension)?.clone();
            let root_base = cx
                .concrete_resource(&base)
                .map(|model| model.relational_model.root.name.clone())
                .unwrap_or_default();

            let mut objects = vec![];
            find_site_objects(
                &ext_builder.json_schema_for_insert,
                &JsonPath::root(),
                &mut objects,
            );

            // Collection bases of the core resource, extended with the
            // extension's own scopes
            let mut collection_bases = cx.resource_builder(&base)?.collection_bases.clone();

            for object in &objects {
                let owning_scope = {
                    let Some(model) = cx.concrete_resource(&base) else {
                        return Err(Error::invalid_schema(format!(
                            "Extension resource '{extension}' extends '{base}', which has no model"
                        )));
                    };
                    let tables = &model.relational_model.tables;
                    match owning_table_index(tables, &object.extension_path) {
                        Some(index) => tables[index].scope.clone(),
                        None => {
                            return Err(Error::invalid_schema(format!(
                                "Extension site '{}' on resource '{extension}' has no owning table \
                                 in resource '{base}'",
                                object.extension_path
                            )))
                        }
                    }
                };

                let site = ExtensionSiteContext {
                    resource: base.clone(),
                    owning_scope: owning_scope.canonical().to_string(),
                    extension_path: object.extension_path.canonical().to_string(),
                };
                let project = cx.resolve_extension_project_key(&object.key, &site)?;

                sites_by_base
                    .entry(base.clone())
                    .or_default()
                    .entry((owning_scope.clone(), object.extension_path.clone()))
                    .or_default()
                    .insert(object.key.clone());

                let ext_scope = owning_scope.property("_ext").property(&object.key);
                let object_path = object.extension_path.property(&object.key);
                let skip = ext_builder.reference_object_paths();

                let Some(model) = cx
                    .concrete_resources
                    .iter_mut()
                    .find(|model| model.resource() == &base)
                else {
                    return Err(Error::invalid_schema(format!(
                        "Extension resource '{extension}' extends '{base}', which has no model"
                    )));
                };
                let model = &mut model.relational_model;

                let ext_index = match model.tables.iter().position(|t| t.scope == ext_scope) {
                    Some(index) => index,
                    None => {
                        let Some(owner) = model.tables.iter().find(|t| t.scope == owning_scope) else {
                            return Err(crate::err!("owning scope '{owning_scope}' vanished"));
                        };

                        let name = DbTableName::new(
                            &project.physical_schema,
                            format!("{}Extension", owner.table.name),
                        );
                        let mut table =
                            keyed_table(name, ext_scope.clone(), owner.key_columns.clone());
                        let fk = parent_foreign_key(&table, owner);
                        table.push_constraint(fk);

                        if let Some(base_name) = collection_bases.get(&owning_scope).cloned() {
                            collection_bases.insert(ext_scope.clone(), base_name);
                        }

                        model.tables.push(table);
                        model.tables.len() - 1
                    }
                };

                ScopeDerivation {
                    root_base: &root_base,
                    skip: &skip,
                    overrides: &mut ext_builder.name_overrides,
                    tables: &mut model.tables,
                    collection_bases: &mut collection_bases,
                }
                .walk(&object.node, &object_path, ext_index)?;

                let first_edge = model.descriptor_edge_sources.len();

                ColumnDerivation {
                    resource: extension,
                    descriptor_paths: &ext_builder.descriptor_paths,
                    decimal_infos: &ext_builder.decimal_infos,
                    identity_paths: &[],
                    skip: &skip,
                    overrides: &mut ext_builder.name_overrides,
                    tables: &mut model.tables,
                    edges: &mut model.descriptor_edge_sources,
                }
                .walk(&object.node, &object_path, object.optional)?;

                for edge in &model.descriptor_edge_sources[first_edge..] {
                    ensure_descriptor_target(&cx.schema, extension, edge)?;
                }
            }

            log::debug!(
                "extension {extension}: {} sites on {base}",
                objects.len()
            );

            cx.resource_builder(extension)?.name_overrides = ext_builder.name_overrides;
            cx.resource_builder(&base)?.collection_bases = collection_bases;
        }

        for (base, sites) in sites_by_base {
            let sites = sites
                .into_iter()
                .map(|((owning_scope, extension_path), keys)| ExtensionSite {
                    owning_scope,
                    extension_path,
                    project_keys: keys.into_iter().collect(),
                })
                .collect();
            cx.register_extension_sites(&base, sites)?;
        }

        Ok(())
    }
}

/// The core resource an extension resource extends: the non-extension
/// resource of the same name.
pub(super) fn base_resource_of(
    cx: &RelationalModelSetBuilderContext<'_>,
    extension: &QualifiedResourceName,
) -> Result<QualifiedResourceName> {
    let candidates: Vec<&QualifiedResourceName> = cx
        .concrete_resources
        .iter()
        .map(|model| model.resource())
        .filter(|name| name.resource_name == extension.resource_name)
        .filter(|name| {
            cx.project_info_by_name(&name.project_name)
                .is_some_and(|info| !info.is_extension_project)
        })
        .collect();

    match candidates.as_slice() {
        [base] => Ok((*base).clone()),
        [] => Err(Error::invalid_schema(format!(
            "Extension resource '{extension}' does not extend any core resource"
        ))),
        many => Err(Error::invalid_schema(format!(
            "Extension resource '{extension}' matches more than one core resource: {}",
            many.iter()
                .map(|name| name.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

fn find_site_objects(node: &Value, path: &JsonPath, out: &mut Vec<SiteObject>) {
    let Some(properties) = traversal::properties(node) else {
        return;
    };

    for (name, child) in properties {
        let child_path = path.property(name);

        if name == "_ext" {
            let ext_optional = !traversal::is_required(node, "_ext");
            for (key, object) in traversal::properties(child).into_iter().flatten() {
                out.push(SiteObject {
                    extension_path: child_path.clone(),
                    key: key.clone(),
                    node: object.clone(),
                    optional: ext_optional || !traversal::is_required(child, key),
                });
            }
            continue;
        }

        match traversal::schema_type(child) {
            Some("object") => find_site_objects(child, &child_path, out),
            Some("array") => {
                if let Some(items) = child.get("items") {
                    find_site_objects(items, &child_path.any_element(), out);
                }
            }
            _ => {}
        }
    }
}
