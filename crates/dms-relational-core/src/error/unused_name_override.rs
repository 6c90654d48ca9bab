use crate::schema::QualifiedResourceName;

/// A declared name override that no pass applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedNameOverrideEntry {
    pub raw_key: String,
    pub canonical_path: String,
}

#[derive(Debug)]
pub(super) struct UnusedNameOverride {
    resource: QualifiedResourceName,
    entries: Vec<UnusedNameOverrideEntry>,
}

impl std::error::Error for UnusedNameOverride {}

impl core::fmt::Display for UnusedNameOverride {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "relational.nameOverrides entries did not match any derived columns or collection \
             scopes on resource '{}': ",
            self.resource
        )?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}' (canonical '{}')", entry.raw_key, entry.canonical_path)?;
        }
        Ok(())
    }
}

impl super::Error {
    pub fn unused_name_overrides(
        resource: QualifiedResourceName,
        entries: Vec<UnusedNameOverrideEntry>,
    ) -> super::Error {
        super::Error::from(super::ErrorKind::UnusedNameOverride(UnusedNameOverride {
            resource,
            entries,
        }))
    }

    pub fn is_unused_name_override(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnusedNameOverride(_)))
    }
}
