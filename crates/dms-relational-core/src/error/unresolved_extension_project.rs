use crate::schema::QualifiedResourceName;

/// Where in a resource an `_ext` project key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSiteContext {
    pub resource: QualifiedResourceName,
    pub owning_scope: String,
    pub extension_path: String,
}

/// Why an `_ext` project key failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionKeyFailure {
    /// More than one project matched. `matched_by` is `endpoint name` or
    /// `project name`; candidates are `(endpoint, project name)` pairs.
    Ambiguous {
        matched_by: &'static str,
        candidates: Vec<(String, String)>,
    },

    /// No configured project matched.
    NotFound,

    /// The key matched a core (non-extension) project.
    NonExtension {
        endpoint_name: String,
        project_name: String,
    },
}

#[derive(Debug)]
pub(super) struct UnresolvedExtensionProject {
    project_key: Box<str>,
    failure: ExtensionKeyFailure,
    site: ExtensionSiteContext,
}

impl std::error::Error for UnresolvedExtensionProject {}

impl core::fmt::Display for UnresolvedExtensionProject {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Extension project key '{}' ", self.project_key)?;

        match &self.failure {
            ExtensionKeyFailure::Ambiguous {
                matched_by,
                candidates,
            } => {
                write!(f, "matches multiple configured projects by {matched_by}: ")?;
                for (i, (endpoint, name)) in candidates.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{endpoint} ({name})")?;
                }
            }
            ExtensionKeyFailure::NotFound => f.write_str("does not match any configured project")?,
            ExtensionKeyFailure::NonExtension {
                endpoint_name,
                project_name,
            } => write!(
                f,
                "resolves to non-extension project '{endpoint_name}' ({project_name})"
            )?,
        }

        write!(
            f,
            " (resource '{}', owning scope '{}', extension path '{}')",
            self.site.resource, self.site.owning_scope, self.site.extension_path
        )
    }
}

impl super::Error {
    pub fn unresolved_extension_project(
        project_key: &str,
        failure: ExtensionKeyFailure,
        site: ExtensionSiteContext,
    ) -> super::Error {
        super::Error::from(super::ErrorKind::UnresolvedExtensionProject(
            UnresolvedExtensionProject {
                project_key: project_key.into(),
                failure,
                site,
            },
        ))
    }

    pub fn is_unresolved_extension_project(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnresolvedExtensionProject(_)))
    }
}
