use super::hash::hash8;

use std::fmt;

/// Target SQL engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SqlDialect {
    Pgsql,
    Mssql,
}

/// The scope within which a kind of name must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    Schema,
    Table,
}

/// Default schema of the shared `Document` and `Descriptor` tables.
pub const CORE_SCHEMA_NAME: &str = "dms";

/// Dialect-specific limits and conventions consulted by the passes.
pub trait SqlDialectRules: fmt::Debug {
    /// The dialect these rules describe.
    fn dialect(&self) -> SqlDialect;

    fn max_identifier_length(&self) -> usize;

    /// Schema holding the shared `Document` and `Descriptor` tables.
    fn core_schema_name(&self) -> &str {
        CORE_SCHEMA_NAME
    }

    /// Scope in which index names must be unique.
    fn index_name_scope(&self) -> NameScope;

    /// Scope in which trigger names must be unique.
    fn trigger_name_scope(&self) -> NameScope;

    /// Whether reference foreign keys may cascade identity updates.
    fn allows_cascading_updates(&self) -> bool;

    /// Fits `name` within the identifier limit.
    ///
    /// Names that already fit are returned unchanged. Longer names keep a
    /// prefix and end with `_` and the first eight hex characters of the
    /// SHA-256 of the full name.
    fn shorten_identifier(&self, name: &str) -> String {
        fit_identifier(self.dialect(), name, name, self.max_identifier_length())
    }
}

/// Length of `name` as `dialect` counts it: UTF-8 bytes for PostgreSQL,
/// characters for SQL Server.
pub(crate) fn identifier_length(dialect: SqlDialect, name: &str) -> usize {
    match dialect {
        SqlDialect::Pgsql => name.len(),
        SqlDialect::Mssql => name.chars().count(),
    }
}

/// Longest prefix of `name` within `max` units, cut on a character boundary.
fn truncate_identifier(dialect: SqlDialect, name: &str, max: usize) -> &str {
    let end = match dialect {
        SqlDialect::Pgsql => name
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end <= max)
            .last()
            .unwrap_or(0),
        SqlDialect::Mssql => name
            .char_indices()
            .nth(max)
            .map_or(name.len(), |(i, _)| i),
    };
    &name[..end]
}

/// Fits `name` within `max` units of `dialect`, using `hash_source` for the
/// suffix.
pub(crate) fn fit_identifier(
    dialect: SqlDialect,
    name: &str,
    hash_source: &str,
    max: usize,
) -> String {
    if identifier_length(dialect, name) <= max {
        return name.to_string();
    }

    let hash = hash8(hash_source);
    let keep = max.saturating_sub(hash.len() + 1);
    let prefix = truncate_identifier(dialect, name, keep);
    format!("{}_{}", prefix.trim_end_matches('_'), hash)
}

/// PostgreSQL: 63-byte identifiers; index names share the schema namespace
/// while trigger names are per table.
#[derive(Debug, Default, Clone)]
pub struct PgsqlDialectRules;

impl SqlDialectRules for PgsqlDialectRules {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Pgsql
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn index_name_scope(&self) -> NameScope {
        NameScope::Schema
    }

    fn trigger_name_scope(&self) -> NameScope {
        NameScope::Table
    }

    fn allows_cascading_updates(&self) -> bool {
        true
    }
}

/// SQL Server: 128-character identifiers; index names are per table while
/// trigger names share the schema namespace. Cascading updates across
/// multiple paths are rejected by the engine, so reference keys never cascade.
#[derive(Debug, Default, Clone)]
pub struct MssqlDialectRules;

impl SqlDialectRules for MssqlDialectRules {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Mssql
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    fn index_name_scope(&self) -> NameScope {
        NameScope::Table
    }

    fn trigger_name_scope(&self) -> NameScope {
        NameScope::Schema
    }

    fn allows_cascading_updates(&self) -> bool {
        false
    }
}

impl SqlDialect {
    /// Default rules for this dialect.
    pub fn default_rules(self) -> Box<dyn SqlDialectRules + Send + Sync> {
        match self {
            SqlDialect::Pgsql => Box::new(PgsqlDialectRules),
            SqlDialect::Mssql => Box::new(MssqlDialectRules),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlDialect::Pgsql => "pgsql",
            SqlDialect::Mssql => "mssql",
        })
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => Ok(SqlDialect::Pgsql),
            "mssql" | "sqlserver" => Ok(SqlDialect::Mssql),
            other => Err(crate::err!("unknown SQL dialect `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_unchanged() {
        assert_eq!(PgsqlDialectRules.shorten_identifier("Student"), "Student");
    }

    #[test]
    fn long_names_fit_with_hash_suffix() {
        let long = "StudentEducationOrganizationAssociationStudentCharacteristicPeriod";
        let short = PgsqlDialectRules.shorten_identifier(long);

        assert_eq!(short.len(), 63);
        assert!(short.starts_with("StudentEducationOrganizationAssociation"));
        assert!(short.ends_with(&format!("_{}", hash8(long))));
        assert_eq!(MssqlDialectRules.shorten_identifier(long), long);
    }

    #[test]
    fn pgsql_limits_count_bytes() {
        // 31 two-byte characters: 62 bytes, within the limit
        let fits = "é".repeat(31);
        assert_eq!(PgsqlDialectRules.shorten_identifier(&fits), fits);

        let long = format!("Student{}", "é".repeat(40));
        assert_eq!(long.chars().count(), 47);

        let short = PgsqlDialectRules.shorten_identifier(&long);
        assert!(short.len() <= 63, "{short} is {} bytes", short.len());
        assert!(short.starts_with("Studentéé"));
        assert!(short.ends_with(&format!("_{}", hash8(&long))));

        // Character-counted, the same name fits SQL Server as is
        assert_eq!(MssqlDialectRules.shorten_identifier(&long), long);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        assert_eq!(truncate_identifier(SqlDialect::Pgsql, "aéb", 2), "a");
        assert_eq!(truncate_identifier(SqlDialect::Pgsql, "aéb", 3), "aé");
        assert_eq!(truncate_identifier(SqlDialect::Mssql, "aéb", 2), "aé");
        assert_eq!(truncate_identifier(SqlDialect::Mssql, "aéb", 5), "aéb");
    }

    #[test]
    fn parse_dialect() {
        assert_eq!("PostgreSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Pgsql);
        assert_eq!("mssql".parse::<SqlDialect>().unwrap(), SqlDialect::Mssql);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }
}
