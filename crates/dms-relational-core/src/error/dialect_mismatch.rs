use crate::schema::SqlDialect;

#[derive(Debug)]
pub(super) struct DialectMismatch {
    requested: SqlDialect,
    rules: SqlDialect,
}

impl std::error::Error for DialectMismatch {}

impl core::fmt::Display for DialectMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "dialect rules mismatch: requested dialect {:?} but rules are for {:?}",
            self.requested, self.rules
        )
    }
}

impl super::Error {
    /// The dialect rules object does not describe the requested dialect.
    pub fn dialect_mismatch(requested: SqlDialect, rules: SqlDialect) -> super::Error {
        super::Error::from(super::ErrorKind::DialectMismatch(DialectMismatch {
            requested,
            rules,
        }))
    }

    pub fn is_dialect_mismatch(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::DialectMismatch(_)))
    }
}
