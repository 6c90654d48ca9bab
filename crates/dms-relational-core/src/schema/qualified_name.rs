use std::fmt;

/// Stable identity of a resource across projects.
///
/// Ordered by project name, then resource name, both ordinal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedResourceName {
    pub project_name: String,
    pub resource_name: String,
}

impl QualifiedResourceName {
    pub fn new(project_name: impl Into<String>, resource_name: impl Into<String>) -> Self {
        QualifiedResourceName {
            project_name: project_name.into(),
            resource_name: resource_name.into(),
        }
    }
}

impl fmt::Display for QualifiedResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_name, self.resource_name)
    }
}
