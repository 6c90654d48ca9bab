//! Computes which JSON paths of each resource hold descriptor values.

use super::{name::to_pascal_case, normalize::NormalizedSchemaSet, JsonPath, QualifiedResourceName};

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPathInfo {
    pub path: JsonPath,
    pub descriptor_resource: QualifiedResourceName,
}

pub type DescriptorPathMap = BTreeMap<JsonPath, DescriptorPathInfo>;

/// Descriptor paths of one resource, split at `_ext`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDescriptorPaths {
    pub base: DescriptorPathMap,
    pub extension: DescriptorPathMap,
}

impl ResourceDescriptorPaths {
    fn from_combined(combined: DescriptorPathMap) -> Self {
        let (extension, base) = combined
            .into_iter()
            .partition(|(path, _)| path.is_extension());
        ResourceDescriptorPaths { base, extension }
    }

    /// Union of both maps; extension entries win on key collision.
    pub fn combined(&self) -> DescriptorPathMap {
        let mut out = self.base.clone();
        out.extend(self.extension.clone());
        out
    }
}

/// Resolves descriptor paths for every concrete and abstract resource.
pub fn resolve_descriptor_paths(
    set: &NormalizedSchemaSet,
) -> BTreeMap<QualifiedResourceName, ResourceDescriptorPaths> {
    let mut maps: BTreeMap<QualifiedResourceName, DescriptorPathMap> = BTreeMap::new();

    for (_, schema) in set.resources() {
        let mut map = DescriptorPathMap::new();

        for mapping in &schema.descriptors {
            map.insert(
                mapping.path.clone(),
                DescriptorPathInfo {
                    path: mapping.path.clone(),
                    descriptor_resource: mapping.descriptor_resource.clone(),
                },
            );
        }

        let reference_paths: Vec<&JsonPath> = schema
            .references
            .iter()
            .flat_map(|mapping| &mapping.reference_json_paths)
            .map(|binding| &binding.reference_json_path)
            .collect();

        for path in &schema.identity_json_paths {
            if map.contains_key(path) || reference_paths.contains(&path) {
                continue;
            }
            if let Some(info) = inferred(&schema.resource.project_name, path) {
                map.insert(path.clone(), info);
            }
        }

        maps.insert(schema.resource.clone(), map);
    }

    for project in &set.projects {
        for resource in &project.abstract_resources {
            let map = resource
                .identity_json_paths
                .iter()
                .filter_map(|path| Some((path.clone(), inferred(&resource.resource.project_name, path)?)))
                .collect();
            maps.insert(resource.resource.clone(), map);
        }
    }

    propagate_through_references(set, &mut maps);

    maps.into_iter()
        .map(|(name, map)| (name, ResourceDescriptorPaths::from_combined(map)))
        .collect()
}

/// Identity paths named `*Descriptor` without an explicit mapping.
fn inferred(project_name: &str, path: &JsonPath) -> Option<DescriptorPathInfo> {
    let last = path.last_property()?;
    last.ends_with("Descriptor").then(|| DescriptorPathInfo {
        path: path.clone(),
        descriptor_resource: QualifiedResourceName::new(project_name, to_pascal_case(last)),
    })
}

/// A reference path whose target identity path is a descriptor is itself a
/// descriptor path. Repeats until nothing changes, since targets may gain
/// paths through their own references.
fn propagate_through_references(
    set: &NormalizedSchemaSet,
    maps: &mut BTreeMap<QualifiedResourceName, DescriptorPathMap>,
) {
    loop {
        let mut additions = vec![];

        for (_, schema) in set.resources() {
            for mapping in &schema.references {
                let Some(target) = maps.get(&mapping.target) else {
                    continue;
                };

                for binding in &mapping.reference_json_paths {
                    let Some(info) = target.get(&binding.identity_json_path) else {
                        continue;
                    };

                    let known = maps
                        .get(&schema.resource)
                        .is_some_and(|map| map.contains_key(&binding.reference_json_path));

                    if !known {
                        additions.push((
                            schema.resource.clone(),
                            DescriptorPathInfo {
                                path: binding.reference_json_path.clone(),
                                descriptor_resource: info.descriptor_resource.clone(),
                            },
                        ));
                    }
                }
            }
        }

        if additions.is_empty() {
            return;
        }

        for (resource, info) in additions {
            maps.entry(resource)
                .or_default()
                .insert(info.path.clone(), info);
        }
    }
}
