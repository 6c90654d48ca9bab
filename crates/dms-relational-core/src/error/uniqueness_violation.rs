/// Two inventory entries share a name within one uniqueness scope.
#[derive(Debug)]
pub(super) struct UniquenessViolation {
    message: Box<str>,
}

impl std::error::Error for UniquenessViolation {}

impl core::fmt::Display for UniquenessViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "uniqueness violation: {}", self.message)
    }
}

impl super::Error {
    pub fn uniqueness_violation(message: impl Into<String>) -> super::Error {
        super::Error::from(super::ErrorKind::UniquenessViolation(UniquenessViolation {
            message: message.into().into(),
        }))
    }

    pub fn is_uniqueness_violation(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UniquenessViolation(_)))
    }
}
