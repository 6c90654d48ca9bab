/// A deduplicated descriptor storage column did not resolve to exactly one
/// foreign key constraint.
#[derive(Debug)]
pub(super) struct DescriptorFkResolution {
    table: Box<str>,
    storage_column: Box<str>,
    found: usize,
}

impl std::error::Error for DescriptorFkResolution {}

impl core::fmt::Display for DescriptorFkResolution {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.found == 0 {
            write!(
                f,
                "Expected descriptor FK constraint for table '{}' storage column '{}', but none were found.",
                self.table, self.storage_column
            )
        } else {
            write!(
                f,
                "Expected exactly one descriptor FK constraint for table '{}' storage column '{}', but found {}.",
                self.table, self.storage_column, self.found
            )
        }
    }
}

impl super::Error {
    pub fn descriptor_fk_resolution(
        table: impl core::fmt::Display,
        storage_column: &str,
        found: usize,
    ) -> super::Error {
        super::Error::from(super::ErrorKind::DescriptorFkResolution(
            DescriptorFkResolution {
                table: table.to_string().into(),
                storage_column: storage_column.into(),
                found,
            },
        ))
    }

    pub fn is_descriptor_fk_resolution(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::DescriptorFkResolution(_)))
    }
}
