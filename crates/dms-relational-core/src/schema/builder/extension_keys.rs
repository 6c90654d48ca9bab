use super::RelationalModelSetBuilderContext;
use crate::{
    schema::ProjectSchemaInfo, Error, ExtensionKeyFailure, ExtensionSiteContext, Result,
};

impl RelationalModelSetBuilderContext<'_> {
    /// Resolves an `_ext` project key to its extension project.
    ///
    /// Matching is case-insensitive, by endpoint name first and then by
    /// project name. Successful resolutions are cached per key.
    pub fn resolve_extension_project_key(
        &mut self,
        key: &str,
        site: &ExtensionSiteContext,
    ) -> Result<ProjectSchemaInfo> {
        let cache_key = key.to_lowercase();

        if let Some(info) = self
            .extension_project_keys
            .get(&cache_key)
            .and_then(|endpoint| self.project_infos.get(endpoint))
        {
            return Ok(info.clone());
        }

        let fail = |failure| Error::unresolved_extension_project(key, failure, site.clone());

        let by_endpoint: Vec<&ProjectSchemaInfo> = self
            .project_infos
            .values()
            .filter(|info| info.project_endpoint_name.to_lowercase() == cache_key)
            .collect();

        let (candidates, matched_by) = if by_endpoint.is_empty() {
            let by_name: Vec<&ProjectSchemaInfo> = self
                .project_infos
                .values()
                .filter(|info| info.project_name.to_lowercase() == cache_key)
                .collect();
            (by_name, "project name")
        } else {
            (by_endpoint, "endpoint name")
        };

        let info = match candidates.as_slice() {
            [] => return Err(fail(ExtensionKeyFailure::NotFound)),
            [info] => (*info).clone(),
            many => {
                return Err(fail(ExtensionKeyFailure::Ambiguous {
                    matched_by,
                    candidates: many
                        .iter()
                        .map(|info| {
                            (
                                info.project_endpoint_name.clone(),
                                info.project_name.clone(),
                            )
                        })
                        .collect(),
                }))
            }
        };

        if !info.is_extension_project {
            return Err(fail(ExtensionKeyFailure::NonExtension {
                endpoint_name: info.project_endpoint_name,
                project_name: info.project_name,
            }));
        }

        log::trace!(
            "extension key '{key}' resolved to project '{}'",
            info.project_endpoint_name
        );

        self.extension_project_keys
            .insert(cache_key, info.project_endpoint_name.clone());
        Ok(info)
    }
}
