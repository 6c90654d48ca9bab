use super::db::DbTableName;
use crate::IdentifierCollisionRecord;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// Namespace within which a shortened identifier must stay unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentifierScope {
    Schema,

    /// Tables and views of one schema
    Table { schema: String },

    Column { table: DbTableName },

    Constraint { schema: String },

    IndexInSchema { schema: String },

    IndexOnTable { table: DbTableName },

    TriggerInSchema { schema: String },

    TriggerOnTable { table: DbTableName },
}

impl fmt::Display for IdentifierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierScope::Schema => f.write_str("schema"),
            IdentifierScope::Table { schema } => write!(f, "table {schema}"),
            IdentifierScope::Column { table } => write!(f, "column {table}"),
            IdentifierScope::Constraint { schema } => write!(f, "constraint {schema}"),
            IdentifierScope::IndexInSchema { schema } => write!(f, "index {schema}"),
            IdentifierScope::IndexOnTable { table } => write!(f, "index {table}"),
            IdentifierScope::TriggerInSchema { schema } => write!(f, "trigger {schema}"),
            IdentifierScope::TriggerOnTable { table } => write!(f, "trigger {table}"),
        }
    }
}

/// Records every identifier rewritten by dialect shortening and reports the
/// shortened names claimed by more than one original.
///
/// Collisions accumulate; nothing is reported until [`collisions`] is read.
///
/// [`collisions`]: OverrideCollisionDetector::collisions
#[derive(Debug, Default, Clone)]
pub struct OverrideCollisionDetector {
    claims: BTreeMap<IdentifierScope, BTreeMap<String, BTreeSet<String>>>,
}

impl OverrideCollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        scope: IdentifierScope,
        original: impl Into<String>,
        shortened: impl Into<String>,
    ) {
        self.claims
            .entry(scope)
            .or_default()
            .entry(shortened.into())
            .or_default()
            .insert(original.into());
    }

    pub fn is_empty(&self) -> bool {
        self.collisions().is_empty()
    }

    /// Collisions ordered by scope, then shortened name.
    pub fn collisions(&self) -> Vec<IdentifierCollisionRecord> {
        let mut out = vec![];

        for (scope, claims) in &self.claims {
            for (shortened, originals) in claims {
                if originals.len() > 1 {
                    out.push(IdentifierCollisionRecord {
                        scope: scope.to_string(),
                        shortened: shortened.clone(),
                        originals: originals.iter().cloned().collect(),
                    });
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_original_registered_twice_is_not_a_collision() {
        let mut detector = OverrideCollisionDetector::new();
        let scope = IdentifierScope::Table {
            schema: "edfi".to_string(),
        };

        detector.register(scope.clone(), "Student", "Student");
        detector.register(scope, "Student", "Student");

        assert!(detector.is_empty());
    }

    #[test]
    fn collisions_are_scoped() {
        let mut detector = OverrideCollisionDetector::new();
        let student = DbTableName::new("edfi", "Student");
        let school = DbTableName::new("edfi", "School");

        detector.register(IdentifierScope::Column { table: student.clone() }, "LongNameA", "LongName");
        detector.register(IdentifierScope::Column { table: school }, "LongNameB", "LongName");
        assert!(detector.is_empty());

        detector.register(IdentifierScope::Column { table: student }, "LongNameB", "LongName");

        let collisions = detector.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(
            collisions[0].to_string(),
            "column edfi.Student 'LongName' <= [LongNameA, LongNameB]"
        );
    }
}
