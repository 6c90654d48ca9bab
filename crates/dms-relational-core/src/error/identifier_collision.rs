/// One shortened identifier claimed by more than one original identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierCollisionRecord {
    /// Rendered uniqueness scope, e.g. `column edfi.Student`.
    pub scope: String,
    pub shortened: String,
    /// Original identifiers, sorted.
    pub originals: Vec<String>,
}

impl core::fmt::Display for IdentifierCollisionRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} '{}' <= [{}]",
            self.scope,
            self.shortened,
            self.originals.join(", ")
        )
    }
}

#[derive(Debug)]
pub(super) struct IdentifierCollision {
    records: Vec<IdentifierCollisionRecord>,
}

impl std::error::Error for IdentifierCollision {}

impl core::fmt::Display for IdentifierCollision {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("Identifier shortening collisions detected: ")?;
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl super::Error {
    pub fn identifier_collisions(records: Vec<IdentifierCollisionRecord>) -> super::Error {
        super::Error::from(super::ErrorKind::IdentifierCollision(IdentifierCollision {
            records,
        }))
    }

    pub fn is_identifier_collision(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::IdentifierCollision(_)))
    }
}
